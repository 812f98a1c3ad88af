use std::sync::Arc;

use fleet_sim::config::SimulatorConfig;
use fleet_sim::scheduler::JobStatus;
use fleet_sim::shell::{Shell, ShellCommand};
use fleet_sim::Simulator;

fn create_shell() -> (Shell, Arc<Simulator>) {
    let sim = Arc::new(
        Simulator::new(SimulatorConfig::new(1, 0.01).with_poll_interval_ms(50)).unwrap(),
    );
    (Shell::new(sim.clone()), sim)
}

async fn run_script(shell: &Shell, script: &str) -> String {
    let mut output = Vec::new();
    shell.run(script.as_bytes(), &mut output).await.unwrap();
    String::from_utf8(output).unwrap()
}

#[test]
fn test_parse_commands() {
    assert_eq!(
        "add J1 PLA 10 2".parse::<ShellCommand>().unwrap(),
        ShellCommand::Add {
            id: "J1".to_string(),
            material: "PLA".to_string(),
            est_time: 10.0,
            priority: 2,
        }
    );
    assert_eq!(
        "cancel J1".parse::<ShellCommand>().unwrap(),
        ShellCommand::Cancel("J1".to_string())
    );
    assert_eq!("LIST".parse::<ShellCommand>().unwrap(), ShellCommand::List);
    assert_eq!("records".parse::<ShellCommand>().unwrap(), ShellCommand::Records);
    assert_eq!("status".parse::<ShellCommand>().unwrap(), ShellCommand::Status);
    assert_eq!("stats".parse::<ShellCommand>().unwrap(), ShellCommand::Stats);
    assert_eq!("help".parse::<ShellCommand>().unwrap(), ShellCommand::Help);
    assert_eq!("stop".parse::<ShellCommand>().unwrap(), ShellCommand::Stop);
    assert_eq!("quit".parse::<ShellCommand>().unwrap(), ShellCommand::Stop);
}

#[test]
fn test_parse_errors() {
    assert!("add J1 PLA".parse::<ShellCommand>().unwrap_err().contains("usage"));
    assert!("add J1 PLA ten 0"
        .parse::<ShellCommand>()
        .unwrap_err()
        .contains("invalid time"));
    assert!("add J1 PLA 10 high"
        .parse::<ShellCommand>()
        .unwrap_err()
        .contains("invalid priority"));
    assert!("cancel".parse::<ShellCommand>().unwrap_err().contains("usage"));
    assert!("print".parse::<ShellCommand>().unwrap_err().contains("unknown command"));
}

#[tokio::test]
async fn test_add_list_and_cancel() {
    let (shell, sim) = create_shell();

    let output = run_script(
        &shell,
        "add J1 PLA 10 2\nadd J2 ABS 5 1\nlist\ncancel J1\ncancel J1\nrecords\n",
    )
    .await;

    assert!(output.contains("Added job J1: PLA, 10s, priority 2"));
    assert!(output.contains("Added job J2: ABS, 5s, priority 1"));
    assert!(output.contains("Canceled job J1"));
    assert!(output.contains("Job J1 not found or no longer queued"));
    assert!(output.contains("canceled"));

    let active = sim.list_active().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id(), "J2");
    assert_eq!(active[0].status(), JobStatus::Queued);
}

#[tokio::test]
async fn test_invalid_input_keeps_session_alive() {
    let (shell, sim) = create_shell();

    let output = run_script(&shell, "bogus\nadd J1 PLA -5 0\nadd J2 PLA 5 0\n").await;

    assert!(output.contains("Error: unknown command 'bogus'"));
    assert!(output.contains("Error: Estimated time must be a positive number"));
    assert!(output.contains("Added job J2"));
    assert_eq!(sim.list_active().await.len(), 1);
}

#[tokio::test]
async fn test_stop_ends_session() {
    let (shell, sim) = create_shell();

    let output = run_script(&shell, "add J1 PLA 5 0\nstop\nadd J2 PLA 5 0\n").await;

    assert!(output.starts_with("Available commands:"));
    assert!(output.contains("Stopping"));
    assert!(!output.contains("Added job J2"));
    assert_eq!(sim.list_active().await.len(), 1);
}

#[tokio::test]
async fn test_empty_views() {
    let (shell, _sim) = create_shell();

    assert_eq!(shell.execute(ShellCommand::List).await, "No active jobs\n");
    assert_eq!(shell.execute(ShellCommand::Records).await, "No job records\n");

    let stats = shell.execute(ShellCommand::Stats).await;
    assert!(stats.contains("Average wait:    0.000s"));
    assert!(stats.contains("Worker 0: 0.0% utilization"));
}

#[tokio::test]
async fn test_status_counts() {
    let (shell, sim) = create_shell();
    sim.start().await.unwrap();

    shell
        .execute(ShellCommand::Add {
            id: "J1".to_string(),
            material: "PLA".to_string(),
            est_time: 1.0,
            priority: 0,
        })
        .await;
    tokio::time::timeout(std::time::Duration::from_secs(5), sim.wait_until_drained())
        .await
        .unwrap();
    sim.stop().await;

    let status = shell.execute(ShellCommand::Status).await;
    assert!(status.contains("Workers: 1"));
    assert!(status.contains("Completed: 1"));
    assert!(status.contains("Processed: 1"));
}

#[tokio::test]
async fn test_list_and_records_render_one_line_per_row() {
    let (shell, sim) = create_shell();
    run_script(&shell, "add J1 PLA 10 2\nadd J2 ABS 5 1\ncancel J2\n").await;

    let list = shell.execute(ShellCommand::List).await;
    let lines: Vec<&str> = list.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("ID"));
    assert!(lines[1].starts_with("J1"));
    assert!(lines[1].contains("PLA"));
    assert!(lines[1].ends_with("queued"));
    assert!(list.ends_with('\n'));

    let records = shell.execute(ShellCommand::Records).await;
    let lines: Vec<&str> = records.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("J2"));
    assert!(lines[1].contains("canceled"));

    assert_eq!(sim.list_records().await.len(), 1);
}
