use tokio_util::sync::CancellationToken;

use fairsched::arbiter;
use fairsched::config::SchedulerConfig;
use fairsched::event::EventLog;
use fairsched::scheduler::{Decision, JobScheduler, JobSchedulerHandle, NodeLoad, Task, TaskInput};

fn nodes(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn spawn_job(name: &str, cluster: &[&str]) -> (JobSchedulerHandle, CancellationToken) {
    let coordinator = CancellationToken::new();
    let handle = JobScheduler::spawn(
        name,
        nodes(cluster),
        coordinator.clone(),
        SchedulerConfig::default(),
        EventLog::disabled(),
    );
    (handle, coordinator)
}

async fn queue_local_task(job: &JobSchedulerHandle, id: u64, host: &str) {
    let input = TaskInput::new(format!("disco://{}", id), host);
    let task = Task::new(id, "map", vec![input.clone()]);
    job.new_task(task, vec![NodeLoad::new(10, input)])
        .await
        .unwrap();
}

#[tokio::test]
async fn local_work_is_served_without_consulting_peers() {
    let (job, _c1) = spawn_job("job@a", &["a", "b"]);
    let (peer, _c2) = spawn_job("job@b", &["a", "b"]);
    queue_local_task(&job, 1, "a").await;

    let decision = arbiter::schedule(&job, &[peer], nodes(&["a", "b"])).await;
    match decision {
        Decision::Run { node, task } => {
            assert_eq!(node, "a");
            assert_eq!(task.task_id, 1);
        }
        other => panic!("expected Run, got {:?}", other),
    }
}

#[tokio::test]
async fn nolocal_falls_back_to_idle_nodes_surrendered_by_peers() {
    let (job, _c1) = spawn_job("job@a", &["a", "b"]);
    let (peer, _c2) = spawn_job("job@b", &["a", "b"]);
    // Data-local work at a only; the offered node is b.
    queue_local_task(&job, 1, "a").await;

    let decision = arbiter::schedule(&job, &[peer], nodes(&["b"])).await;
    match decision {
        Decision::Run { node, task } => {
            assert_eq!(node, "b");
            assert_eq!(task.task_id, 1);
        }
        other => panic!("expected Run, got {:?}", other),
    }
    // The task was displaced off a's bucket.
    assert_eq!(job.stats().await.unwrap().queued, 0);
}

#[tokio::test]
async fn peer_with_nopref_work_surrenders_nothing() {
    let (job, _c1) = spawn_job("job@a", &["a", "b"]);
    let (peer, _c2) = spawn_job("job@b", &["a", "b"]);
    queue_local_task(&job, 1, "a").await;
    // The peer holds no-preference work: it wants every idle node itself.
    queue_local_task(&peer, 2, "h9").await;

    let decision = arbiter::schedule(&job, &[peer], nodes(&["b"])).await;
    assert_eq!(decision, Decision::NoNodes);
    assert_eq!(job.stats().await.unwrap().queued, 1);
}

#[tokio::test]
async fn peer_with_local_work_keeps_its_node() {
    let (job, _c1) = spawn_job("job@a", &["a", "b"]);
    let (peer, _c2) = spawn_job("job@b", &["a", "b"]);
    queue_local_task(&job, 1, "a").await;
    queue_local_task(&peer, 2, "b").await;

    // b is data-local to the peer, so it is not free for remote work.
    let decision = arbiter::schedule(&job, &[peer], nodes(&["b"])).await;
    assert_eq!(decision, Decision::NoNodes);
}

#[tokio::test]
async fn dead_peer_is_skipped_during_fan_out() {
    let (job, _c1) = spawn_job("job@a", &["a", "b"]);

    let coordinator = CancellationToken::new();
    coordinator.cancel();
    let dead_peer = JobScheduler::spawn(
        "job@dead",
        nodes(&["a", "b"]),
        coordinator,
        SchedulerConfig::default(),
        EventLog::disabled(),
    );

    queue_local_task(&job, 1, "a").await;
    let decision = arbiter::schedule(&job, &[dead_peer], nodes(&["b"])).await;
    match decision {
        Decision::Run { node, .. } => assert_eq!(node, "b"),
        other => panic!("expected Run, got {:?}", other),
    }
}

#[tokio::test]
async fn dead_job_yields_no_decision() {
    let coordinator = CancellationToken::new();
    coordinator.cancel();
    let job = JobScheduler::spawn(
        "job@dead",
        nodes(&["a"]),
        coordinator,
        SchedulerConfig::default(),
        EventLog::disabled(),
    );

    let decision = arbiter::schedule(&job, &[], nodes(&["a"])).await;
    assert_eq!(decision, Decision::NoNodes);
}

#[tokio::test]
async fn fan_out_intersects_across_all_peers() {
    let (p1, _c1) = spawn_job("job@p1", &["a", "b", "c"]);
    let (p2, _c2) = spawn_job("job@p2", &["a", "b", "c"]);
    queue_local_task(&p1, 1, "a").await;
    queue_local_task(&p2, 2, "b").await;

    let free = arbiter::cross_job_empty_nodes(&[p1, p2], nodes(&["a", "b", "c"])).await;
    assert_eq!(free, nodes(&["c"]));
}
