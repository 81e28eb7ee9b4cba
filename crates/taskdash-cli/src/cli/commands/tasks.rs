//! Task command handlers.
//!
//! Every command checks the session first; a missing or expired session
//! fails before any request is made.

use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table};
use taskdash_core::tasks::{NewTask, Task, TaskStatus, TaskUpdate};
use taskdash_core::{Error, TaskClient};

const NOT_LOGGED_IN: &str = "Not logged in. Run `taskdash login` first";

fn require_session(client: &mut TaskClient) -> Result<()> {
    client.require_session().context(NOT_LOGGED_IN)?;
    Ok(())
}

/// Adds a re-login hint when the server rejected the session mid-command.
fn explain(err: Error) -> anyhow::Error {
    if err.is_unauthorized() {
        anyhow::Error::new(err).context("Session rejected by the server. Run `taskdash login` again")
    } else {
        err.into()
    }
}

fn render_table(tasks: &[&Task]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Status", "Details"]);
    for task in tasks {
        table.add_row(vec![
            task.id.to_string(),
            task.task_status.to_string(),
            task.task_details.clone(),
        ]);
    }
    table.to_string()
}

pub async fn list(client: &mut TaskClient, status: Option<TaskStatus>, json: bool) -> Result<()> {
    require_session(client)?;
    client.fetch_tasks().await.map_err(explain)?;

    let tasks: Vec<&Task> = match status {
        Some(status) => client.tasks_by_status(status),
        None => client.tasks().tasks().iter().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
    } else if tasks.is_empty() {
        println!("No tasks found.");
    } else {
        println!("{}", render_table(&tasks));
    }
    Ok(())
}

pub async fn show(client: &mut TaskClient, id: &str) -> Result<()> {
    require_session(client)?;
    let task = client.fetch_task(id).await.map_err(explain)?;

    println!("{}", task.task_details);
    println!("  id:     {}", task.id);
    println!("  status: {}", task.task_status);
    Ok(())
}

pub async fn add(client: &mut TaskClient, details: &str, status: Option<TaskStatus>) -> Result<()> {
    require_session(client)?;
    let draft = NewTask::new(details.trim()).with_status(status.unwrap_or_default());
    let created = client.create_task(draft).await.map_err(explain)?;

    // A temporary id means the server did not report one; show the
    // reconciled record instead when it is unambiguous.
    let shown_id = if created.id.is_temporary() {
        let matches: Vec<&Task> = client
            .tasks()
            .tasks()
            .iter()
            .filter(|t| t.task_details == created.task_details)
            .collect();
        match matches.as_slice() {
            [only] => only.id.to_string(),
            _ => "pending".to_string(),
        }
    } else {
        created.id.to_string()
    };

    println!("✓ Task created ({shown_id})");
    Ok(())
}

pub async fn update(
    client: &mut TaskClient,
    id: &str,
    details: Option<String>,
    status: Option<TaskStatus>,
) -> Result<()> {
    require_session(client)?;
    if details.is_none() && status.is_none() {
        anyhow::bail!("Nothing to update: pass --details and/or --status");
    }

    let task = client
        .update_task(
            id,
            TaskUpdate {
                task_details: details,
                task_status: status,
            },
        )
        .await
        .map_err(explain)?;

    println!("✓ Task {} updated ({})", task.id, task.task_status);
    Ok(())
}

pub async fn delete(client: &mut TaskClient, id: &str) -> Result<()> {
    require_session(client)?;
    client.delete_task(id).await.map_err(explain)?;
    println!("✓ Task {id} deleted");
    Ok(())
}

pub async fn complete(client: &mut TaskClient, id: &str) -> Result<()> {
    require_session(client)?;
    // Status changes work from the local list.
    client.fetch_tasks().await.map_err(explain)?;
    let task = client.complete_task(id).await.map_err(explain)?;
    println!("✓ Task {} marked as complete", task.id);
    Ok(())
}

pub async fn toggle(client: &mut TaskClient, id: &str) -> Result<()> {
    require_session(client)?;
    client.fetch_tasks().await.map_err(explain)?;
    let task = client.toggle_task_status(id).await.map_err(explain)?;
    println!("✓ Task {} marked as {}", task.id, task.task_status);
    Ok(())
}

pub async fn stats(client: &mut TaskClient) -> Result<()> {
    require_session(client)?;
    client.fetch_tasks().await.map_err(explain)?;

    let stats = client.stats();
    println!("Total:       {}", stats.total);
    println!("Completed:   {}", stats.completed);
    println!("In progress: {}", stats.in_progress);
    println!("Pending:     {}", stats.pending);
    Ok(())
}
