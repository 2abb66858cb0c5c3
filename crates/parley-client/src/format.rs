//! Display strings derived from backend records.
//!
//! Everything here is pure; the only clock read is in
//! [`message_time_label`].

use chrono::{DateTime, Datelike, Local, NaiveDateTime};
use parley_core::{ChannelRecord, MessageRecord};

/// Label for messages from the previous day of the month.
pub const YESTERDAY: &str = "YESTERDAY";

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Escape text for safe inclusion in HTML.
///
/// Escapes `&`, `<`, `>`, `"`, and `'` so the output is safe in both text
/// content and attribute values.
pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// The channel's name, or its other members' nicknames.
///
/// An explicit name wins. Otherwise the nicknames of every member except
/// `current_user_id` are joined with `,` in member order. Output is
/// HTML-escaped either way.
pub fn channel_display_name(channel: &ChannelRecord, current_user_id: &str) -> String {
    if !channel.name.is_empty() {
        return html_escape(&channel.name);
    }

    channel
        .members
        .iter()
        .filter(|member| member.user_id != current_user_id)
        .map(|member| html_escape(&member.nickname))
        .collect::<Vec<_>>()
        .join(",")
}

/// `count` as a string, or `sentinel` once it exceeds `cap`.
pub fn member_count_label(count: u32, cap: u32, sentinel: &str) -> String {
    if count > cap {
        sentinel.to_string()
    } else {
        count.to_string()
    }
}

/// Preview text for a channel's last message.
///
/// Text-bearing messages show their body; anything else shows its name.
pub fn last_message_label(channel: &ChannelRecord) -> String {
    match &channel.last_message {
        Some(message) if message.kind.has_text() => message.message.clone(),
        Some(message) => message.name.clone(),
        None => String::new(),
    }
}

/// Bucket `created` relative to `now`.
///
/// - `YESTERDAY` when `created`'s day of the month is one less than `now`'s,
///   whatever the month or year
/// - `HH:MM` on the same calendar day
/// - `MON Dsuffix` otherwise, e.g. `MAR 4th`
pub fn timestamp_label(now: NaiveDateTime, created: NaiveDateTime) -> String {
    if created.day().checked_add(1) == Some(now.day()) {
        return YESTERDAY.to_string();
    }
    if created.date() == now.date() {
        return created.format("%H:%M").to_string();
    }

    let month = MONTHS[created.month0() as usize];
    let day = created.day();
    format!("{month} {day}{}", ordinal_suffix(day))
}

/// Suffix for the day of the month: `st`, `en`, `rd`, then `th`.
fn ordinal_suffix(day: u32) -> &'static str {
    match day {
        1 => "st",
        2 => "en",
        3 => "rd",
        _ => "th",
    }
}

/// [`timestamp_label`] for `message` against the local clock.
///
/// Empty when there is no message or its timestamp is out of range.
pub fn message_time_label(message: Option<&MessageRecord>) -> String {
    let Some(created) = message.and_then(|m| DateTime::from_timestamp_millis(m.created_at)) else {
        return String::new();
    };
    let created = created.with_timezone(&Local).naive_local();
    timestamp_label(Local::now().naive_local(), created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use parley_core::MessageKind;
    use parley_test::{test_channel, test_file_message, test_message, test_user};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_display_name_excludes_current_user_and_escapes() {
        let channel = test_channel(
            "ch-1",
            &[test_user("me", "Me"), test_user("u2", "<b>Bob</b>")],
        );
        assert_eq!(channel_display_name(&channel, "me"), "&lt;b&gt;Bob&lt;/b&gt;");
    }

    #[test]
    fn test_display_name_joins_in_member_order() {
        let channel = test_channel(
            "ch-1",
            &[
                test_user("u3", "Carol"),
                test_user("me", "Me"),
                test_user("u2", "Bob"),
            ],
        );
        assert_eq!(channel_display_name(&channel, "me"), "Carol,Bob");
    }

    #[test]
    fn test_explicit_name_wins() {
        let mut channel = test_channel("ch-1", &[test_user("u2", "Bob")]);
        channel.name = "Team & Co".to_string();
        assert_eq!(channel_display_name(&channel, "me"), "Team &amp; Co");
    }

    #[test]
    fn test_member_count_label_boundary() {
        for count in 0..=9 {
            assert_eq!(member_count_label(count, 9, "9+"), count.to_string());
        }
        assert_eq!(member_count_label(9, 9, "9+"), "9");
        assert_eq!(member_count_label(10, 9, "9+"), "9+");
        assert_eq!(member_count_label(250, 99, "99+"), "99+");
    }

    #[test]
    fn test_last_message_label() {
        let mut channel = test_channel("ch-1", &[]);
        assert_eq!(last_message_label(&channel), "");

        channel.last_message = Some(test_message(1, "ch-1", "hello"));
        assert_eq!(last_message_label(&channel), "hello");

        let mut admin = test_message(2, "ch-1", "maintenance at noon");
        admin.kind = MessageKind::Admin;
        channel.last_message = Some(admin);
        assert_eq!(last_message_label(&channel), "maintenance at noon");

        channel.last_message = Some(test_file_message(3, "ch-1", "cat.png"));
        assert_eq!(last_message_label(&channel), "cat.png");
    }

    #[test]
    fn test_same_day_is_zero_padded_time() {
        let now = at(2024, 3, 15, 10, 0);
        assert_eq!(timestamp_label(now, at(2024, 3, 15, 9, 5)), "09:05");
    }

    #[test]
    fn test_previous_day_is_yesterday() {
        let now = at(2024, 3, 15, 10, 0);
        assert_eq!(timestamp_label(now, at(2024, 3, 14, 23, 0)), "YESTERDAY");
    }

    #[test]
    fn test_yesterday_compares_day_of_month_only() {
        let now = at(2024, 3, 15, 10, 0);
        assert_eq!(timestamp_label(now, at(2024, 2, 14, 8, 0)), "YESTERDAY");
        // Month rollover is not recognised.
        assert_eq!(timestamp_label(at(2024, 3, 1, 10, 0), at(2024, 2, 29, 8, 0)), "FEB 29th");
    }

    #[test]
    fn test_older_dates_use_month_and_ordinal() {
        let now = at(2024, 3, 15, 10, 0);
        assert_eq!(timestamp_label(now, at(2024, 1, 2, 0, 0)), "JAN 2en");
        assert_eq!(timestamp_label(now, at(2024, 1, 1, 0, 0)), "JAN 1st");
        assert_eq!(timestamp_label(now, at(2023, 12, 3, 0, 0)), "DEC 3rd");
        assert_eq!(timestamp_label(now, at(2024, 2, 22, 0, 0)), "FEB 22th");
    }

    #[test]
    fn test_message_time_label_without_message() {
        assert_eq!(message_time_label(None), "");
    }

    #[test]
    fn test_message_time_label_today() {
        let message = MessageRecord {
            created_at: Local::now().timestamp_millis(),
            ..test_message(1, "ch-1", "hi")
        };
        let label = message_time_label(Some(&message));
        // Either a same-day time, or the day rolled over mid-test.
        assert!((label.len() == 5 && label.as_bytes()[2] == b':') || label == YESTERDAY);
    }
}
