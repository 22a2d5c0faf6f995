use journal_core::{ReportWindow, StatsDisplay};

use crate::format::{escape_html, group_digits, signed_currency};

const GAIN: &str = "#10b981";
const LOSS: &str = "#ef4444";
const ACCENT: &str = "#2563eb";

pub struct EmailTemplate;

impl EmailTemplate {
    pub fn registration(name: &str, app_url: &str) -> String {
        let body = format!(
            r#"<h1 style="color:#1e293b;margin:0 0 12px;">Welcome to <span style="color:{ACCENT};">ohYaaa</span>, {name}!</h1>
<p style="color:#334155;margin:0 0 20px;">Your trading journal is ready. Start tracking your trades today.</p>
{button}"#,
            name = escape_html(name),
            button = button(app_url, "Open Your Journal"),
        );
        Self::layout(&body, "You are receiving this because you created an ohYaaa account.")
    }

    pub fn mentor_invite(mentor_name: &str, mentee_email: &str, app_url: &str) -> String {
        let body = format!(
            r#"<h1 style="color:#1e293b;margin:0 0 12px;">You've Been Invited!</h1>
<p style="color:#334155;margin:0 0 20px;"><strong>{mentor}</strong> wants to mentor you on ohYaaa.</p>
{button}
<p style="color:#64748b;font-size:12px;margin:20px 0 0;">Log in with {email} to accept.</p>"#,
            mentor = escape_html(mentor_name),
            email = escape_html(mentee_email),
            button = button(app_url, "Accept Invitation"),
        );
        Self::layout(&body, "Someone invited this address to a mentorship on ohYaaa.")
    }

    pub fn invite_accepted(mentee_name: &str, app_url: &str) -> String {
        let body = format!(
            r#"<h1 style="color:#1e293b;margin:0 0 12px;">Great News!</h1>
<p style="color:#334155;margin:0 0 20px;"><strong>{mentee}</strong> accepted your mentorship invitation!</p>
{button}"#,
            mentee = escape_html(mentee_name),
            button = button(app_url, "View Mentee"),
        );
        Self::layout(&body, "You are receiving this because you invited a mentee.")
    }

    /// `profit` and `target` are whole currency units.
    pub fn daily_target(name: &str, profit: i64, target: i64) -> String {
        let body = format!(
            r#"<h1 style="color:#1e293b;margin:0 0 12px;">Daily Target Achieved!</h1>
<p style="color:#334155;margin:0;">Congratulations {name}! You made <strong style="color:{GAIN};">{profit}</strong> (target: ${target})</p>"#,
            name = escape_html(name),
            profit = signed_currency(profit),
            target = group_digits(target.unsigned_abs()),
        );
        Self::layout(&body, "Daily target alerts can be turned off in your settings.")
    }

    pub fn weekly_recap(
        name: &str,
        stats: &StatsDisplay,
        window: &ReportWindow,
        app_url: &str,
    ) -> String {
        let mut rows = vec![
            ("Trades", stats.total_trades.to_string()),
            ("Win Rate", format!("{}%", stats.win_rate_label())),
            ("Wins / Losses", format!("{} / {}", stats.wins, stats.losses)),
            ("Avg Win", signed_currency(stats.avg_win)),
            ("Avg Loss", signed_currency(stats.avg_loss)),
            ("Best Day", signed_currency(stats.best_day)),
            ("Worst Day", signed_currency(stats.worst_day)),
        ];
        if let Some(setup) = &stats.top_setup {
            rows.push(("Top Setup", escape_html(setup)));
        }

        let body = format!(
            r#"<h1 style="color:#1e293b;margin:0 0 4px;">Weekly Recap</h1>
<p style="color:#64748b;margin:0 0 16px;">Hi {name}, here is your week: {start} - {end}</p>
{headline}
{table}
{button}"#,
            name = escape_html(name),
            start = window.start.format("%Y-%m-%d"),
            end = window.end.format("%Y-%m-%d"),
            headline = pnl_headline(stats.total_pnl),
            table = stats_table(&rows),
            button = button(app_url, "View Full Report"),
        );
        Self::layout(&body, "Weekly recaps are sent every Friday afternoon.")
    }

    pub fn monthly_report(
        name: &str,
        stats: &StatsDisplay,
        month_name: &str,
        year: i32,
        app_url: &str,
    ) -> String {
        let mut rows = vec![
            ("Trades", stats.total_trades.to_string()),
            ("Win Rate", format!("{}%", stats.win_rate_label())),
            ("Trading Days", stats.trading_days.to_string()),
            ("Avg per Day", signed_currency(stats.avg_per_day)),
            ("Best Day", signed_currency(stats.best_day)),
            ("Worst Day", signed_currency(stats.worst_day)),
        ];
        if let Some(setup) = &stats.top_setup {
            rows.push(("Top Setup", escape_html(setup)));
        }
        if let Some(progress) = stats.goal_progress {
            rows.push(("Yearly Goal", format!("{progress}%")));
        }

        let body = format!(
            r#"<h1 style="color:#1e293b;margin:0 0 4px;">{month} {year} Report</h1>
<p style="color:#64748b;margin:0 0 16px;">Hi {name}, here is how your month went.</p>
{headline}
{table}
{button}"#,
            month = escape_html(month_name),
            name = escape_html(name),
            headline = pnl_headline(stats.total_pnl),
            table = stats_table(&rows),
            button = button(app_url, "View Full Report"),
        );
        Self::layout(&body, "Monthly reports are sent on the last day of each month.")
    }

    pub fn session_reminder(
        mentee_name: &str,
        mentor_name: &str,
        when: &str,
        topic: &str,
        video_link: Option<&str>,
    ) -> String {
        let join = video_link
            .filter(|link| is_web_link(link))
            .map(|link| button(link.trim(), "Join Video Call"))
            .unwrap_or_default();
        let body = format!(
            r#"<h1 style="color:#1e293b;margin:0 0 12px;">Session Reminder</h1>
<p style="color:#334155;margin:0 0 8px;">Hi {mentee}, your session with <strong>{mentor}</strong> is tomorrow!</p>
<p style="color:#334155;margin:0 0 4px;"><strong>When:</strong> {when}</p>
<p style="color:#334155;margin:0 0 20px;"><strong>Topic:</strong> {topic}</p>
{join}"#,
            mentee = escape_html(mentee_name),
            mentor = escape_html(mentor_name),
            when = escape_html(when),
            topic = escape_html(topic),
        );
        Self::layout(&body, "Session reminders are sent the day before a confirmed session.")
    }

    pub fn verification_code(code: &str, ttl_minutes: u64) -> String {
        let body = format!(
            r#"<h1 style="color:#1e293b;margin:0 0 12px;">Your verification code</h1>
<p style="font-size:32px;font-weight:700;letter-spacing:8px;color:#1e293b;margin:0 0 12px;">{code}</p>
<p style="color:#64748b;margin:0;">This code expires in {ttl_minutes} minutes. If you did not request it, ignore this email.</p>"#,
            code = escape_html(code),
        );
        Self::layout(&body, "Never share this code with anyone.")
    }

    fn layout(body_content: &str, footer: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1"></head>
<body style="margin:0;padding:0;background:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;">
<table width="100%" cellpadding="0" cellspacing="0" style="background:#f1f5f9;padding:32px 0;">
  <tr><td align="center">
    <table width="600" cellpadding="0" cellspacing="0" style="background:#ffffff;border-radius:8px;overflow:hidden;box-shadow:0 1px 3px rgba(0,0,0,0.1);">
      <tr><td style="padding:40px 20px;">
        {body_content}
      </td></tr>
      <tr><td style="padding:16px 20px;border-top:1px solid #e2e8f0;">
        <p style="margin:0;color:#94a3b8;font-size:12px;">{footer}</p>
      </td></tr>
    </table>
    <p style="color:#94a3b8;font-size:11px;margin-top:16px;">ohYaaa Trading Journal</p>
  </td></tr>
</table>
</body>
</html>"#,
            footer = escape_html(footer),
        )
    }
}

/// Only http(s) links become buttons; other schemes are dropped.
fn is_web_link(link: &str) -> bool {
    let link = link.trim().to_ascii_lowercase();
    link.starts_with("https://") || link.starts_with("http://")
}

fn button(href: &str, label: &str) -> String {
    format!(
        r#"<a href="{href}" style="display:inline-block;background:{ACCENT};color:#ffffff;padding:12px 24px;border-radius:8px;text-decoration:none;">{label}</a>"#,
        href = escape_html(href),
        label = escape_html(label),
    )
}

fn pnl_headline(total_pnl: i64) -> String {
    let color = if total_pnl >= 0 { GAIN } else { LOSS };
    format!(
        r#"<p style="font-size:32px;font-weight:bold;color:{color};margin:0 0 16px;">{}</p>"#,
        signed_currency(total_pnl)
    )
}

/// Values are inserted as-is; callers escape free text.
fn stats_table(rows: &[(&str, String)]) -> String {
    let body: String = rows
        .iter()
        .enumerate()
        .map(|(i, (label, value))| {
            let shade = if i % 2 == 1 { r#" style="background:#f8fafc;""# } else { "" };
            format!(
                r#"  <tr{shade}><td style="padding:8px 12px;color:#94a3b8;">{label}</td><td style="padding:8px 12px;font-weight:600;">{value}</td></tr>
"#
            )
        })
        .collect();
    format!(
        "<table style=\"width:100%;border-collapse:collapse;margin:0 0 20px;\">\n{body}</table>"
    )
}
