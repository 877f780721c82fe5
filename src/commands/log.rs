//! Log command handlers: show and clear the activity log.

use cookiesync_core::ActivityLogEntry;

use crate::app::context::AppContext;

pub fn run_log_show_command(ctx: &AppContext, limit: u16) {
    let entries = ctx.activity.entries();
    if entries.is_empty() {
        println!("No activity recorded yet.");
        return;
    }

    let limit = usize::from(limit);
    for entry in entries.iter().take(limit) {
        println!("{}", render_entry(entry));
    }
    if entries.len() > limit {
        println!(
            "Showing {limit} of {} entries; rerun with a higher --limit to see more.",
            entries.len()
        );
    }
}

pub fn run_log_clear_command(ctx: &AppContext) {
    ctx.activity.clear();
    println!("Activity log cleared");
}

fn render_entry(entry: &ActivityLogEntry) -> String {
    format!("[{}] {}", entry.time, entry.message)
}
