// Terminal formatting for tasks and analysis results

use tasklens_core::{Task, TaskFilter};
use tasklens_eye::AnalysisResult;

/// One listing line: checkbox, short id, text, proof marker
pub fn task_line(task: &Task) -> String {
    let checkbox = if task.completed { "[x]" } else { "[ ]" };
    let created = task
        .created_at_utc()
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    let mut line = format!("{} {}  {}  {}", checkbox, task.id.short(), created, task.text);
    if let Some(image) = &task.proof_image {
        line.push_str(&format!("  📷 {}", image.describe()));
    }
    line
}

pub fn remaining_line(active: usize) -> String {
    format!("{} items remaining", active)
}

/// Shown in place of the listing when the filter matches nothing
pub fn empty_message(filter: TaskFilter) -> String {
    match filter {
        TaskFilter::All => "You're all caught up!".to_string(),
        other => format!("No {} tasks found", other),
    }
}

/// Progress line shown while an analysis runs; JSON output stays silent
pub fn analysis_notice(json: bool) -> Option<&'static str> {
    if json {
        None
    } else {
        Some("🔍 Analyzing image...")
    }
}

/// Summary first, then one bullet per label
pub fn analysis_lines(result: &AnalysisResult) -> Vec<String> {
    let mut lines = vec![format!("🔍 {}", result.summary)];
    lines.extend(result.labels.iter().map(|label| format!("   • {}", label)));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasklens_core::ImageRef;

    #[test]
    fn test_task_line() {
        let mut task = Task::new("buy milk").unwrap();
        let line = task_line(&task);
        assert!(line.starts_with("[ ] "));
        assert!(line.contains(&task.id.short()));
        assert!(line.ends_with("buy milk"));

        task.completed = true;
        task.proof_image = Some(ImageRef::Path("/tmp/receipt.jpg".into()));
        let line = task_line(&task);
        assert!(line.starts_with("[x] "));
        assert!(line.contains("📷 file /tmp/receipt.jpg"));
    }

    #[test]
    fn test_empty_messages() {
        assert_eq!(empty_message(TaskFilter::All), "You're all caught up!");
        assert_eq!(empty_message(TaskFilter::Active), "No active tasks found");
        assert_eq!(empty_message(TaskFilter::Completed), "No completed tasks found");
    }

    #[test]
    fn test_remaining_line() {
        assert_eq!(remaining_line(0), "0 items remaining");
        assert_eq!(remaining_line(3), "3 items remaining");
    }

    #[test]
    fn test_analysis_notice() {
        assert_eq!(analysis_notice(false), Some("🔍 Analyzing image..."));
        assert_eq!(analysis_notice(true), None);
    }

    #[test]
    fn test_analysis_lines() {
        let result = AnalysisResult {
            labels: vec!["dog (91%)".to_string(), "frisbee (47%)".to_string()],
            summary: "This image shows a dog".to_string(),
        };
        assert_eq!(
            analysis_lines(&result),
            vec!["🔍 This image shows a dog", "   • dog (91%)", "   • frisbee (47%)"]
        );

        let failed = AnalysisResult {
            labels: vec![],
            summary: "AI analysis unavailable".to_string(),
        };
        assert_eq!(analysis_lines(&failed), vec!["🔍 AI analysis unavailable"]);
    }
}
