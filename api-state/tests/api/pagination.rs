//! Cursor behavior on the paginated handle, over an in-memory listing.

use api_state::{ApiError, Page, PageRequest, PaginatedApi, PaginatedOptions};
use test_helpers::mock::{MockOperation, PagedSource, page_of};
use test_helpers::{course_catalog, init_tracing};

#[tokio::test]
async fn first_fetch_adopts_the_listing_metadata() -> anyhow::Result<()> {
    init_tracing();
    let source = PagedSource::new(course_catalog(47));
    let log = source.log();
    let api = PaginatedApi::new(source.into_operation());

    let page = api.execute().await.expect("first page");

    assert_eq!(page.data.len(), 10);
    assert_eq!(api.total_pages(), 5);
    assert_eq!(api.total_items(), 47);
    assert!(api.has_next_page());
    assert!(!api.has_prev_page());
    assert_eq!(log.calls(), vec![PageRequest { page: 1, limit: 10 }]);
    Ok(())
}

#[tokio::test]
async fn next_then_refresh_stay_on_page_two() -> anyhow::Result<()> {
    init_tracing();
    let source = PagedSource::new(course_catalog(47));
    let log = source.log();
    let api = PaginatedApi::new(source.into_operation());

    api.execute().await;
    api.next_page().await;
    assert_eq!(api.current_page(), 2);
    api.refresh().await;

    assert_eq!(
        log.calls(),
        vec![
            PageRequest { page: 1, limit: 10 },
            PageRequest { page: 2, limit: 10 },
            PageRequest { page: 2, limit: 10 },
        ]
    );
    assert!(api.has_prev_page());
    Ok(())
}

#[tokio::test]
async fn navigation_is_guarded_at_both_ends() -> anyhow::Result<()> {
    init_tracing();
    let source = PagedSource::new(course_catalog(12));
    let log = source.log();
    let api = PaginatedApi::new(source.into_operation());

    api.execute().await; // page 1 of 2
    assert_eq!(api.prev_page().await, None);
    assert_eq!(log.count(), 1);

    api.next_page().await; // page 2 of 2
    assert!(!api.has_next_page());
    assert_eq!(api.next_page().await, None);
    assert_eq!(log.count(), 2);
    assert_eq!(api.current_page(), 2);
    Ok(())
}

#[tokio::test]
async fn go_to_page_clamps_below_one() -> anyhow::Result<()> {
    init_tracing();
    let source = PagedSource::new(course_catalog(12));
    let log = source.log();
    let api = PaginatedApi::new(source.into_operation());

    api.go_to_page(0).await;

    assert_eq!(api.current_page(), 1);
    assert_eq!(log.calls(), vec![PageRequest { page: 1, limit: 10 }]);
    Ok(())
}

#[tokio::test]
async fn page_size_carries_into_every_request() -> anyhow::Result<()> {
    init_tracing();
    let source = PagedSource::new(course_catalog(9));
    let log = source.log();
    let api = PaginatedApi::with_options(
        source.into_operation(),
        PaginatedOptions::default().page_size(4).initial_page(2),
    );

    let page = api.execute().await.expect("second page");

    assert_eq!(page.data.len(), 4);
    assert_eq!(api.total_pages(), 3);
    assert_eq!(log.calls(), vec![PageRequest { page: 2, limit: 4 }]);
    Ok(())
}

#[tokio::test]
async fn immediate_fetches_the_initial_page() -> anyhow::Result<()> {
    init_tracing();
    let source = PagedSource::new(course_catalog(5));
    let log = source.log();
    let api = PaginatedApi::with_options(
        source.into_operation(),
        PaginatedOptions::default().immediate(),
    );

    let mut pages = api.subscribe_pagination();
    pages.wait_for(|info| info.total_items == 5).await?;

    assert_eq!(api.items().len(), 5);
    assert_eq!(api.total_pages(), 1);
    assert_eq!(log.calls(), vec![PageRequest { page: 1, limit: 10 }]);
    Ok(())
}

#[tokio::test]
async fn failed_page_leaves_the_cursor_metadata_alone() -> anyhow::Result<()> {
    init_tracing();
    let items: Vec<u32> = (1..=25).collect();
    let mock = MockOperation::<PageRequest, Page<u32>>::new()
        .then_success(page_of(&items, PageRequest { page: 1, limit: 10 }))
        .then_failure("listing unavailable");
    let api = PaginatedApi::new(mock.into_operation());

    api.execute().await;
    let before = api.pagination();

    assert_eq!(api.refresh().await, None);
    assert_eq!(api.pagination(), before);
    assert_eq!(api.error(), Some(ApiError::business("listing unavailable")));
    // the previously fetched rows are still there
    assert_eq!(api.items(), (1..=10).collect::<Vec<u32>>());
    Ok(())
}

#[tokio::test]
async fn shutdown_stops_further_fetches() -> anyhow::Result<()> {
    init_tracing();
    let source = PagedSource::new(course_catalog(20));
    let log = source.log();
    let api = PaginatedApi::new(source.into_operation());

    api.execute().await;
    api.shutdown();
    assert!(api.is_shut_down());

    assert_eq!(api.refresh().await, None);
    assert_eq!(log.count(), 1);
    Ok(())
}
