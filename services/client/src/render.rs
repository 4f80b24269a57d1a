//! services/client/src/render.rs
//!
//! Plain-text rendering of a session view for the terminal.

use chrono::{DateTime, Local, Utc};
use karaoke_queue_core::{Item, QueueState, QueueView, Session};
use std::fmt::Write;

pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts
            .with_timezone(&Local)
            .format("%A, %B %-d, %Y %H:%M")
            .to_string(),
        None => "Invalid Date".to_string(),
    }
}

/// Header block: title, code, lifetime and progress.
pub fn render_header(session: &Session, view: &QueueView, display_name: Option<&str>, is_admin: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🎤 {}  [code {}]", session.title, session.access_code);
    let _ = writeln!(out, "   Created: {}", format_timestamp(session.created_at));
    let _ = writeln!(out, "   Expires: {}", format_timestamp(session.expires_at));
    let _ = writeln!(
        out,
        "   Singing as: {}{}",
        display_name.unwrap_or("(no name set)"),
        if is_admin { "  [admin]" } else { "" }
    );
    let _ = writeln!(
        out,
        "   Progress: {}/{} done ({:.0}%)",
        view.completed_count,
        view.total_count,
        view.progress_percent()
    );
    out
}

fn render_item(item: &Item, up_next: bool) -> String {
    let marker = if item.is_completed {
        "✔"
    } else if up_next {
        "▶"
    } else {
        " "
    };
    let mut line = format!("{} [{}] {}", marker, item.id, item.title);
    if let Some(artist) = &item.artist {
        let _ = write!(line, " by {}", artist);
    }
    let _ = write!(line, "  (from {})", item.username);
    if up_next {
        line.push_str("  UP NEXT");
    }
    if let Some(url) = &item.video_url {
        let _ = write!(line, "\n      {}", url);
    }
    line
}

/// Queue block. "Up next" is decided by identifier, never by row position.
pub fn render_queue(view: &QueueView) -> String {
    match view.state() {
        QueueState::Empty => "No songs in the queue yet. Be the first to add a song!\n".to_string(),
        QueueState::AllCompleted => format!(
            "All songs completed! ({} done, use --show-completed to list them)\n",
            view.completed_count
        ),
        QueueState::Queue => {
            let mut out = String::new();
            for item in &view.visible_items {
                let _ = writeln!(out, "{}", render_item(item, view.is_next_to_play(&item.id)));
            }
            if !view.show_completed && view.completed_count > 0 {
                let _ = writeln!(out, "({} completed hidden)", view.completed_count);
            }
            out
        }
    }
}
