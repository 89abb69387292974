mod pagination;
mod teardown;

use api_state::{Api, Envelope};
use test_helpers::init_tracing;

#[tokio::test]
async fn execute_round_trip() -> anyhow::Result<()> {
    init_tracing();
    let api = Api::new(|name: String| async move {
        Ok(Envelope::success(name.to_uppercase()))
    });

    let result = api.execute("ok".into()).await;

    assert_eq!(result.as_deref(), Some("OK"));
    Ok(())
}
