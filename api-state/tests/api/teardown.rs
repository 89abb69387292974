//! Shutdown and abandonment: a torn-down handle never writes state or
//! calls its operation again, and a call dropped mid-flight releases
//! the loading flag it claimed.

use api_state::{Api, ApiOptions, RequestState};
use futures::{pin_mut, poll};
use test_helpers::init_tracing;
use test_helpers::mock::{Gate, MockOperation};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn shutdown_mid_flight_suppresses_the_settlement() -> anyhow::Result<()>
{
    init_tracing();
    let gate = Gate::new();
    let mock = MockOperation::<(), u32>::new().then_success(5).gated(&gate);
    let api = Api::new(mock.into_operation());
    let mut rx = api.subscribe();

    let fut = api.execute(());
    pin_mut!(fut);
    assert!(poll!(fut.as_mut()).is_pending());
    // consume the loading=true write so only post-shutdown writes remain
    rx.borrow_and_update();

    api.shutdown();
    gate.open();
    assert_eq!(fut.await, None);

    // nothing was written after teardown
    assert!(!rx.has_changed()?);
    assert_eq!(api.data(), None);
    Ok(())
}

#[tokio::test]
async fn execute_after_shutdown_never_calls_the_operation()
-> anyhow::Result<()> {
    init_tracing();
    let mock = MockOperation::<u32, u32>::new().then_success(1);
    let log = mock.log();
    let api = Api::new(mock.into_operation());

    api.shutdown();
    api.shutdown(); // idempotent
    assert!(api.is_shut_down());

    assert_eq!(api.execute(1).await, None);
    assert_eq!(log.count(), 0);
    assert_eq!(api.state(), RequestState::default());
    Ok(())
}

#[tokio::test]
async fn cancelling_the_parent_scope_is_a_shutdown() -> anyhow::Result<()> {
    init_tracing();
    let scope = CancellationToken::new();
    let gate = Gate::new();
    let mock = MockOperation::<(), u32>::new().then_success(5).gated(&gate);
    let api = Api::with_options(
        mock.into_operation(),
        ApiOptions::default().scope(scope.clone()),
    );

    let fut = api.execute(());
    pin_mut!(fut);
    assert!(poll!(fut.as_mut()).is_pending());

    // the embedding scope tears down, taking the handle with it
    scope.cancel();
    gate.open();
    assert_eq!(fut.await, None);

    assert!(api.is_shut_down());
    assert_eq!(api.execute(()).await, None);
    assert_eq!(api.data(), None);
    Ok(())
}

#[tokio::test]
async fn dropping_a_call_mid_flight_clears_loading() -> anyhow::Result<()> {
    init_tracing();
    let gate = Gate::new();
    let mock = MockOperation::<(), u32>::new()
        .then_success(5)
        .gated(&gate)
        .then_success(7);
    let api = Api::new(mock.into_operation());

    {
        let fut = api.execute(());
        pin_mut!(fut);
        assert!(poll!(fut.as_mut()).is_pending());
        assert!(api.is_loading());
    }

    // the caller walked away mid-flight; the slot must not stay loading
    assert!(!api.is_loading());
    assert_eq!(api.data(), None);
    assert_eq!(api.error(), None);

    // and the slot still serves later calls
    assert_eq!(api.execute(()).await, Some(7));
    Ok(())
}

#[tokio::test]
async fn dropping_a_superseded_call_leaves_the_newer_call_loading()
-> anyhow::Result<()> {
    init_tracing();
    let gate_a = Gate::new();
    let gate_b = Gate::new();
    let mock = MockOperation::<u32, u32>::new()
        .then_success(1)
        .gated(&gate_a)
        .then_success(2)
        .gated(&gate_b);
    let api = Api::new(mock.into_operation());

    let mut first = Box::pin(api.execute(1));
    assert!(poll!(first.as_mut()).is_pending());

    let second = api.execute(2);
    pin_mut!(second);
    assert!(poll!(second.as_mut()).is_pending());

    // dropping the stale call must not release the newer call's loading
    drop(first);
    assert!(api.is_loading());

    gate_b.open();
    assert_eq!(second.await, Some(2));
    assert_eq!(api.data(), Some(2));
    assert!(!api.is_loading());
    Ok(())
}
