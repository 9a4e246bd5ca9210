use std::sync::Arc;
use std::time::Duration;

use parallelogram::{p_filter, p_map, p_reduce, Dispatcher, EngineConfig, FnToken, HandlerRegistry};
use parallelogram_worker::Server;
use serde_json::{json, Value};

fn shared_registry() -> HandlerRegistry {
    let mut r = HandlerRegistry::new();
    r.register_map("increment", |_args, e, i| json!(e.as_i64().unwrap() + i as i64));
    r.register_filter("is_even", |_args, e, _i| e.as_i64().unwrap() % 2 == 0);
    r.register_reduce("sum", |_args, a, b| {
        json!(a.as_i64().unwrap() + b.as_i64().unwrap())
    });
    r
}

async fn with_one_worker<F, Fut>(port: u16, multicast_port: u16, test: F)
where
    F: FnOnce(Dispatcher) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    //env_logger::init();

    let config = EngineConfig::new()
        .with_port(port)
        .with_multicast_group([239, 7, 7, 7], multicast_port)
        .with_discovery_window(Duration::from_millis(300))
        .with_chunk_size(3);

    let server = Server::new(config.clone(), shared_registry());
    server.start().await.expect("worker should start");

    // Give the discovery responder a moment to join the multicast group
    // before the dispatcher's first probe.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let dispatcher = Dispatcher::with_config(Arc::new(shared_registry()), config);
    test(dispatcher).await;

    server.stop().await.expect("worker should stop cleanly");
}

#[tokio::test]
async fn map_round_trips_through_a_real_worker() {
    with_one_worker(18100, 20100, |dispatcher| async move {
        let data: Vec<Value> = (1..=6).map(Value::from).collect();
        let out = p_map(
            &dispatcher,
            FnToken::new("increment"),
            data,
            18100,
            Duration::from_secs(2),
        )
        .await
        .unwrap();
        assert_eq!(
            out,
            vec![json!(1), json!(3), json!(5), json!(7), json!(9), json!(11)]
        );
    })
    .await;
}

#[tokio::test]
async fn filter_round_trips_through_a_real_worker() {
    with_one_worker(18110, 20110, |dispatcher| async move {
        let data: Vec<Value> = (1..=6).map(Value::from).collect();
        let out = p_filter(
            &dispatcher,
            FnToken::new("is_even"),
            data,
            18110,
            Duration::from_secs(2),
        )
        .await
        .unwrap();
        assert_eq!(out, vec![json!(2), json!(4), json!(6)]);
    })
    .await;
}

#[tokio::test]
async fn reduce_recurses_until_it_fits_one_chunk() {
    with_one_worker(18120, 20120, |dispatcher| async move {
        // chunk_size = 3, so 9 elements need two reduce rounds to collapse
        // to a residual that fits a single chunk.
        let data: Vec<Value> = (1..=9).map(Value::from).collect();
        let out = p_reduce(
            &dispatcher,
            FnToken::new("sum"),
            data,
            18120,
            Duration::from_secs(2),
        )
        .await
        .unwrap();
        assert_eq!(out, json!(45));
    })
    .await;
}

#[tokio::test]
async fn result_order_survives_out_of_order_chunk_completion() {
    // Many small chunks funnel through one worker's single-threaded queue
    // (§4.8), so replies land back at the dispatcher in whatever order the
    // processor loop happened to drain them in; reassembly is keyed by
    // chunk index (§4.7), not arrival order.
    with_one_worker(18130, 20130, |dispatcher| async move {
        let data: Vec<Value> = (0..10).map(Value::from).collect();
        let out = p_map(
            &dispatcher,
            FnToken::new("increment"),
            data.clone(),
            18130,
            Duration::from_secs(2),
        )
        .await
        .unwrap();

        let expected: Vec<Value> = data
            .iter()
            .enumerate()
            .map(|(i, e)| json!(e.as_i64().unwrap() + i as i64))
            .collect();
        assert_eq!(out, expected);
    })
    .await;
}
