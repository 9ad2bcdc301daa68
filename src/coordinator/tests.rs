use super::*;
use crate::error::ExchangePhase;
use crate::protocol::{link, PartialResult, WorkerLink};

fn identity_scenario() -> (Vec<Element>, Matrix) {
    let matrix = Matrix::from_rows(vec![vec![1, 0, 0], vec![0, 1, 0], vec![1, 1, 1]]).unwrap();
    (vec![1, 2, 3], matrix)
}

fn sample_matrix(rows: usize, cols: usize) -> Matrix {
    let rows = (0..rows)
        .map(|r| (0..cols).map(|c| (r * 7 + c * 3) as i32 % 11 - 5).collect())
        .collect();
    Matrix::new(cols, rows).unwrap()
}

fn quick(timeout_ms: u64) -> Coordinator {
    Coordinator::new(CoordinatorOptions {
        workers: 1,
        timeout: Some(Duration::from_millis(timeout_ms)),
        channel_capacity: 16,
    })
}

#[tokio::test]
async fn test_two_workers_with_remainder() {
    let (vector, matrix) = identity_scenario();
    let coordinator = Coordinator::new(CoordinatorOptions::with_workers(2));
    let result = coordinator.run(&vector, &matrix).await.unwrap();
    assert_eq!(result, vec![1, 2, 6]);
}

#[tokio::test]
async fn test_no_workers_computes_everything_locally() {
    let vector = vec![2, 2];
    let matrix = Matrix::from_rows(vec![vec![1, 1], vec![3, 3]]).unwrap();
    let coordinator = Coordinator::new(CoordinatorOptions::with_workers(0));
    let result = coordinator.run(&vector, &matrix).await.unwrap();
    assert_eq!(result, vec![4, 12]);
}

#[tokio::test]
async fn test_result_matches_sequential_for_boundary_worker_counts() {
    let matrix = sample_matrix(9, 4);
    let vector = vec![3, -1, 4, 1];
    let expected = matrix.multiply(&vector).unwrap();
    let n = matrix.row_count();

    for workers in [0, 1, n - 1, n, n + 5] {
        let coordinator = Coordinator::new(CoordinatorOptions::with_workers(workers));
        let result = coordinator.run(&vector, &matrix).await.unwrap();
        assert_eq!(result, expected, "workers = {workers}");
    }
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let matrix = sample_matrix(17, 5);
    let vector = vec![1, 2, 3, 4, 5];
    let coordinator = Coordinator::new(CoordinatorOptions::with_workers(4));

    let first = coordinator.run(&vector, &matrix).await.unwrap();
    for _ in 0..5 {
        assert_eq!(coordinator.run(&vector, &matrix).await.unwrap(), first);
    }
}

#[tokio::test]
async fn test_more_workers_than_rows_does_not_stall() {
    let (vector, matrix) = identity_scenario();
    let coordinator = Coordinator::new(CoordinatorOptions {
        workers: 8,
        timeout: Some(Duration::from_secs(5)),
        channel_capacity: 1,
    });
    let result = coordinator.run(&vector, &matrix).await.unwrap();
    assert_eq!(result, vec![1, 2, 6]);
}

#[tokio::test]
async fn test_empty_matrix() {
    let matrix = Matrix::new(3, Vec::new()).unwrap();
    let coordinator = Coordinator::new(CoordinatorOptions::with_workers(3));
    let result = coordinator.run(&[1, 2, 3], &matrix).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_empty_matrix_without_declared_width_accepts_any_vector() {
    let matrix = Matrix::from_rows(Vec::new()).unwrap();
    for workers in [0, 2] {
        let coordinator = Coordinator::new(CoordinatorOptions::with_workers(workers));
        let result = coordinator.run(&[1, 2], &matrix).await.unwrap();
        assert!(result.is_empty());
    }
}

#[tokio::test]
async fn test_vector_width_mismatch_fails_before_dispatch() {
    let (_, matrix) = identity_scenario();
    let coordinator = Coordinator::new(CoordinatorOptions::with_workers(2));
    let err = coordinator.run(&[1, 2], &matrix).await.unwrap_err();
    assert!(matches!(
        err,
        MatvecError::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
}

#[tokio::test]
async fn test_overflow_names_same_global_row_for_any_worker_count() {
    let matrix = Matrix::from_rows(vec![vec![1, 1], vec![i32::MIN, i32::MIN]]).unwrap();
    let vector = vec![i32::MIN, i32::MIN];

    // row 1 lands on the coordinator, worker 1, worker 2, then the coordinator again
    for workers in [0, 1, 2, 3] {
        let coordinator = Coordinator::new(CoordinatorOptions::with_workers(workers));
        let err = coordinator.run(&vector, &matrix).await.unwrap_err();
        assert!(
            matches!(err, MatvecError::Overflow { row: 1 }),
            "workers = {workers}: {err:?}"
        );
    }
}

#[tokio::test]
async fn test_silent_worker_becomes_stall_with_deadline() {
    let (vector, matrix) = identity_scenario();
    let (coordinator_end, _silent) = link(1, 16);

    let err = quick(50)
        .run_with_links(&vector, &matrix, vec![coordinator_end])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MatvecError::CommunicationStall {
            worker: 1,
            phase: ExchangePhase::Collect,
            ..
        }
    ));
}

#[tokio::test]
async fn test_silent_worker_blocks_without_deadline() {
    let (vector, matrix) = identity_scenario();
    let (coordinator_end, _silent) = link(1, 16);
    let coordinator = Coordinator::new(CoordinatorOptions::default());

    let outcome = tokio::time::timeout(
        Duration::from_millis(100),
        coordinator.run_with_links(&vector, &matrix, vec![coordinator_end]),
    )
    .await;
    assert!(outcome.is_err(), "run should still be waiting");
}

#[tokio::test]
async fn test_worker_not_reading_stalls_dispatch() {
    let (vector, matrix) = identity_scenario();
    let (coordinator_end, _silent) = link(1, 1);

    let err = quick(50)
        .run_with_links(&vector, &matrix, vec![coordinator_end])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MatvecError::CommunicationStall {
            phase: ExchangePhase::Dispatch,
            ..
        }
    ));
}

/// A peer that drains its assignment and replies with `reply`.
fn scripted_peer(mut worker_end: WorkerLink, reply: PartialResult) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Ok(Dispatch::Dimensions { stride, .. }) = worker_end.recv().await {
            if stride > 0 {
                for _ in 0..=stride {
                    let _ = worker_end.recv().await;
                }
            }
        }
        let _ = worker_end.send(reply).await;
        // keep the link open until the coordinator is done
        let _ = worker_end.recv().await;
    })
}

#[tokio::test]
async fn test_short_partial_result_is_rejected() {
    let matrix = sample_matrix(4, 2);
    let (coordinator_end, worker_end) = link(1, 16);
    let peer = scripted_peer(worker_end, PartialResult::empty(1));

    let err = quick(1000)
        .run_with_links(&[1, 1], &matrix, vec![coordinator_end])
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("partial result has 0 values, expected 4"));
    peer.abort();
}

#[tokio::test]
async fn test_mislabelled_partial_result_is_rejected() {
    let matrix = sample_matrix(2, 2);
    let (coordinator_end, worker_end) = link(1, 16);
    let peer = scripted_peer(
        worker_end,
        PartialResult {
            rank: 7,
            values: vec![0, 0],
        },
    );

    let err = quick(1000)
        .run_with_links(&[1, 1], &matrix, vec![coordinator_end])
        .await
        .unwrap_err();
    assert!(matches!(err, MatvecError::WorkerFailed { worker: 1, .. }));
    assert!(err.to_string().contains("reply labelled with rank 7"));
    peer.abort();
}

#[tokio::test]
async fn test_scripted_peer_result_is_placed_by_identity() {
    let matrix = sample_matrix(5, 2);
    let (coordinator_end, worker_end) = link(1, 16);
    // one worker owns all five rows; report a recognisable slice
    let peer = scripted_peer(
        worker_end,
        PartialResult {
            rank: 1,
            values: vec![10, 11, 12, 13, 14],
        },
    );

    let result = quick(1000)
        .run_with_links(&[1, 1], &matrix, vec![coordinator_end])
        .await
        .unwrap();
    assert_eq!(result, vec![10, 11, 12, 13, 14]);
    peer.abort();
}

#[tokio::test]
async fn test_out_of_order_links_are_rejected() {
    let (vector, matrix) = identity_scenario();
    let (second, _w2) = link(2, 4);
    let (first, _w1) = link(1, 4);

    let err = quick(50)
        .run_with_links(&vector, &matrix, vec![second, first])
        .await
        .unwrap_err();
    assert!(matches!(err, MatvecError::Config(_)));
}

#[tokio::test]
async fn test_run_from_files_rejects_bad_input_before_dispatch() {
    let dir = tempfile::TempDir::new().unwrap();
    let vector_path = dir.path().join("vector.txt");
    let matrix_path = dir.path().join("matrix.txt");
    std::fs::write(&vector_path, "1 2 3\n").unwrap();
    std::fs::write(&matrix_path, "2\n1 2 3\n4 5\n").unwrap();

    let coordinator = Coordinator::new(CoordinatorOptions::with_workers(2));
    let err = coordinator
        .run_from_files(&vector_path, &matrix_path)
        .await
        .unwrap_err();
    assert!(matches!(err, MatvecError::Input { line: 3, .. }));
}

#[test]
fn test_options_from_config() {
    let mut config = MatvecConfig::new();
    config.workers = 6;
    config.timeout = Some(Duration::from_secs(2));
    let options = CoordinatorOptions::from(&config);
    assert_eq!(options.workers, 6);
    assert_eq!(options.timeout, Some(Duration::from_secs(2)));
    assert_eq!(options.channel_capacity, 16);
}
