//! Display helpers for timestamps, previews and avatars.
//!
//! Locale strings are Indonesian, as the JuruTani UI ships them.  All
//! functions are pure; callers pass `now` in so rendering is deterministic.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use jurutani_shared::constants::MAX_MESSAGE_CHARS;
use jurutani_shared::{Conversation, Message, UserId};

const WEEKDAYS_SHORT: [&str; 7] = ["Sen", "Sel", "Rab", "Kam", "Jum", "Sab", "Min"];
const MONTHS_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];
const MONTHS_LONG: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

// id-ID clock rendering uses a period separator, e.g. "14.30".
fn clock(ts: DateTime<Utc>) -> String {
    format!("{:02}.{:02}", ts.hour(), ts.minute())
}

fn weekday_short(ts: DateTime<Utc>) -> &'static str {
    WEEKDAYS_SHORT[ts.weekday().num_days_from_monday() as usize]
}

fn day_month_short(ts: DateTime<Utc>) -> String {
    format!("{} {}", ts.day(), MONTHS_SHORT[ts.month0() as usize])
}

fn is_yesterday(ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.date_naive()
        .pred_opt()
        .map_or(false, |yesterday| ts.date_naive() == yesterday)
}

/// Timestamp label next to a message bubble.
pub fn format_message_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if ts.date_naive() == now.date_naive() {
        return clock(ts);
    }
    if is_yesterday(ts, now) {
        return "Kemarin".to_string();
    }
    if now.signed_duration_since(ts) < Duration::days(7) {
        return weekday_short(ts).to_string();
    }
    day_month_short(ts)
}

/// Recency label in the conversation list.
pub fn format_last_message_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(ts);
    if diff < Duration::minutes(1) {
        return "Baru saja".to_string();
    }
    if diff < Duration::hours(1) {
        return format!("{}m", diff.num_minutes());
    }
    if ts.date_naive() == now.date_naive() {
        return clock(ts);
    }
    if is_yesterday(ts, now) {
        return "Kemarin".to_string();
    }
    if diff < Duration::days(7) {
        return weekday_short(ts).to_string();
    }
    day_month_short(ts)
}

/// Shorten a preview to `max_chars`, appending an ellipsis when cut.
pub fn truncate_message(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Messages grouped by calendar day, labelled "7 Agustus 2026" style.
/// Assumes the input is in timeline order.
pub fn group_messages_by_date(messages: &[Message]) -> Vec<(String, Vec<&Message>)> {
    let mut groups: Vec<(String, Vec<&Message>)> = Vec::new();
    for m in messages {
        let label = format!(
            "{} {} {}",
            m.created_at.day(),
            MONTHS_LONG[m.created_at.month0() as usize],
            m.created_at.year()
        );
        match groups.last_mut() {
            Some((current, bucket)) if *current == label => bucket.push(m),
            _ => groups.push((label, vec![m])),
        }
    }
    groups
}

/// First letter of the display name, for avatar placeholders.
pub fn avatar_fallback(full_name: &str) -> String {
    full_name
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| "?".to_string())
}

/// Whether `content` is sendable as-is: non-blank and within the advisory
/// length bound.
pub fn is_valid_message(content: &str) -> bool {
    let trimmed = content.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= MAX_MESSAGE_CHARS
}

/// List title for a conversation: the partner's name.
pub fn conversation_title(conversation: &Conversation, viewer: UserId) -> String {
    conversation
        .partner_profile(viewer)
        .map(|p| p.full_name.clone())
        .unwrap_or_else(|| "Unknown User".to_string())
}
