use hostpack::utils::{HostpackError, WatchConfig, WatchController, WatchSignal};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::unbounded_channel;

fn controller(debounce_ms: u64) -> WatchController {
    WatchController::new(WatchConfig {
        debounce: Duration::from_millis(debounce_ms),
        ..Default::default()
    })
}

fn changed(name: &str) -> WatchSignal {
    WatchSignal::Changed(PathBuf::from("src").join(name))
}

#[tokio::test]
async fn test_failed_rebuild_keeps_watching() {
    let (tx, rx) = unbounded_channel();
    let calls = Arc::new(AtomicUsize::new(0));

    let feeder = tokio::spawn(async move {
        tx.send(changed("orders.ts")).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(changed("orders.ts")).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        // Dropping the sender ends the session
    });

    let counter = calls.clone();
    let result = controller(20)
        .run_events(
            rx,
            move |_path| {
                let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if call == 1 {
                        Err(HostpackError::bundle("orders", "src/orders.ts", "syntax error"))
                    } else {
                        Ok(())
                    }
                }
            },
            std::future::pending::<()>(),
        )
        .await;

    feeder.await.unwrap();
    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_burst_coalesces_into_one_rebuild() {
    let (tx, rx) = unbounded_channel();
    let calls = Arc::new(AtomicUsize::new(0));

    let feeder = tokio::spawn(async move {
        for name in ["a.ts", "b.ts", "c.ts", "a.ts", "d.ts"] {
            tx.send(changed(name)).unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    });

    let counter = calls.clone();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let recorded = seen.clone();
    controller(60)
        .run_events(
            rx,
            move |path| {
                counter.fetch_add(1, Ordering::SeqCst);
                recorded.lock().unwrap().push(path);
                async { Ok(()) }
            },
            std::future::pending::<()>(),
        )
        .await
        .unwrap();

    feeder.await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock().unwrap(), vec![PathBuf::from("src/d.ts")]);
}

#[tokio::test]
async fn test_shutdown_stops_session() {
    let (tx, rx) = unbounded_channel();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    // Change arrives but shutdown fires before the quiet period ends
    tx.send(changed("orders.ts")).unwrap();
    let result = controller(500)
        .run_events(
            rx,
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await;

    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    drop(tx);
}

#[tokio::test]
async fn test_watch_real_directory_until_shutdown() {
    let temp_dir = tempfile::tempdir().unwrap();
    let src = temp_dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();

    let controller = WatchController::new(WatchConfig {
        watch_paths: vec![src.clone()],
        debounce: Duration::from_millis(20),
        ignored_dirs: vec![temp_dir.path().join("dist")],
    });

    let result = controller
        .watch(|_| async { Ok(()) }, tokio::time::sleep(Duration::from_millis(100)))
        .await;
    assert!(result.is_ok());
}
