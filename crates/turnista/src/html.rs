use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::export::{self, cell_text};
use crate::parser::RosterForm;
use crate::scheduler::Conflict;
use crate::trial::TrialStatus;
use crate::types::{is_weekend, Roster};

fn page(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container { (body) }
            }
        }
    }
}

/// The roster settings form
pub fn render_form(
    company: &str,
    form: &RosterForm,
    error: Option<&str>,
    trial: TrialStatus,
) -> Markup {
    let days_left = match trial {
        TrialStatus::Active { days_left } => Some(days_left),
        _ => None,
    };

    let body = html! {
        h1 { (company) }
        p.subtitle { "Shift roster generator" }

        @if let Some(days_left) = days_left {
            div.banner.trial { "Trial version: " (days_left) " days left" }
        }
        @if let Some(error) = error {
            div.banner.error { (error) }
        }

        form method="post" action="/generate" {
            section {
                h2 { "1. Staff" }
                p.hint {
                    "Comma-separated names, or one person per line: "
                    code { "Anna: Barista, Cameriere | rest=1 | off=mon | leave=2025-08-10..2025-08-20" }
                }
                textarea name="staff" rows="6" { (form.staff) }
            }
            section {
                h2 { "2. Shifts" }
                p.hint {
                    "Comma-separated shift names, or one shift per line with roles: "
                    code { "Pranzo: Cuoco x2, Cameriere" }
                }
                textarea name="shifts" rows="4" { (form.shifts) }
                label {
                    "People per shift without roles "
                    input type="number" name="staff_per_shift" min="1" value=(form.staff_per_shift);
                }
            }
            section {
                h2 { "3. Period and rules" }
                div.row {
                    label { "From " input type="date" name="start" value=(form.start); }
                    label { "To " input type="date" name="end" value=(form.end); }
                }
                div.row {
                    label {
                        input type="checkbox" name="weekend_fairness" checked[form.weekend_fairness.is_some()];
                        " Share weekends fairly"
                    }
                    label {
                        input type="checkbox" name="avoid_consecutive" checked[form.avoid_consecutive.is_some()];
                        " No first shift after a last shift"
                    }
                }
                div.row {
                    label {
                        "Max days in a row "
                        input type="number" name="max_consecutive_days" min="1" value=(form.max_consecutive_days);
                    }
                    label {
                        "Seed "
                        input type="number" name="seed" min="0" value=(form.seed);
                    }
                }
            }
            button.primary type="submit" { "Generate roster" }
        }
    };

    page(company, body)
}

/// The generated roster with editing controls
pub fn render_roster(roster: &Roster, company: &str, conflicts: &[Conflict]) -> Markup {
    let staff_names: Vec<&str> = roster.request.staff.iter().map(|m| m.name.as_str()).collect();
    let uncovered = roster.uncovered().len();
    let chat = export::to_chat_text(roster, company);

    let body = html! {
        h1 { (company) }
        p.subtitle {
            (roster.request.start.format("%d/%m/%Y").to_string()) " - " (roster.request.end.format("%d/%m/%Y").to_string())
            " · seed " (roster.seed)
        }

        @if uncovered > 0 {
            div.banner.error #"uncovered-count" { (uncovered) " uncovered slots" }
        }
        @if !conflicts.is_empty() {
            div.banner.warning {
                p { "Rules broken by manual changes:" }
                ul.conflicts {
                    @for conflict in conflicts {
                        li { (conflict.to_string()) }
                    }
                }
            }
        }

        nav.actions {
            a href="/" { "New roster" }
            form method="post" action="/roster/regenerate" {
                button type="submit" { "Regenerate" }
            }
            a href="/roster/export.csv?layout=grid" { "CSV" }
            a href="/roster/export.csv?layout=long" { "CSV (one row per slot)" }
            a href="/roster/export.csv?layout=summary" { "CSV summary" }
            a href="/roster/chat.txt" { "Chat text" }
            a href="/roster/print" target="_blank" { "Print" }
        }

        table.roster {
            thead {
                tr {
                    th { "Date" }
                    @for shift in &roster.request.shifts {
                        th { (shift.name) }
                    }
                }
            }
            tbody {
                @for date in roster.days() {
                    tr.weekend[is_weekend(date)] {
                        th.date { (date.format("%a %d/%m").to_string()) }
                        @for shift in &roster.request.shifts {
                            @let show_role = shift.roles.len() > 1;
                            td {
                                @for a in roster.slots_for(date, &shift.name) {
                                    form.slot.uncovered[a.is_uncovered()] method="post" action="/roster/assign" {
                                        input type="hidden" name="date" value=(a.date.to_string());
                                        input type="hidden" name="shift" value=(a.shift);
                                        input type="hidden" name="role" value=(a.role);
                                        input type="hidden" name="slot" value=(a.slot);
                                        @if show_role {
                                            span.role { (a.role) }
                                        }
                                        select name="staff" onchange="this.form.submit()" {
                                            option value="" selected[a.is_uncovered()] { "(uncovered)" }
                                            @for name in &staff_names {
                                                option value=(name) selected[a.staff.as_deref() == Some(*name)] { (name) }
                                            }
                                        }
                                        noscript { button type="submit" { "Set" } }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        h2 { "Summary" }
        table.summary {
            thead {
                tr {
                    th { "Staff" }
                    th { "Shifts" }
                    th { "Weekend" }
                    th { "Days" }
                    th { "Target" }
                }
            }
            tbody {
                @for stats in roster.stats() {
                    tr.over[stats.days_worked > stats.target] {
                        td { (stats.name) }
                        td { (stats.shifts) }
                        td { (stats.weekend_shifts) }
                        td { (stats.days_worked) }
                        td { (stats.target) }
                    }
                }
            }
        }

        h2 { "Chat text" }
        textarea #"chat-text" rows="12" readonly { (chat) }
        button type="button" onclick="copyChat()" { "Copy" }
        script { (PreEscaped(JAVASCRIPT)) }
    };

    page(company, body)
}

/// Printable roster without controls
pub fn render_print(roster: &Roster, company: &str) -> Markup {
    let body = html! {
        h1 { (company) }
        p.subtitle {
            (roster.request.start.format("%d/%m/%Y").to_string()) " - " (roster.request.end.format("%d/%m/%Y").to_string())
        }
        table.roster.print {
            thead {
                tr {
                    th { "Date" }
                    @for shift in &roster.request.shifts {
                        th { (shift.name) }
                    }
                }
            }
            tbody {
                @for date in roster.days() {
                    tr {
                        th.date { (date.format("%a %d/%m").to_string()) }
                        @for shift in &roster.request.shifts {
                            td { (cell_text(roster, date, shift)) }
                        }
                    }
                }
            }
        }
        script { "window.print();" }
    };

    page(company, body)
}

/// Shown instead of every page once the trial is over
pub fn render_trial_expired(company: &str, trial_days: u32) -> Markup {
    let body = html! {
        h1 { (company) }
        div.banner.error {
            "The " (trial_days) "-day trial has ended. Contact your supplier to keep using the roster generator."
        }
    };

    page(company, body)
}

/// Generic error page with a link back to the form
pub fn render_message(company: &str, message: &str) -> Markup {
    let body = html! {
        h1 { (company) }
        div.banner.error { (message) }
        p { a href="/" { "Back to the form" } }
    };

    page(company, body)
}

const CSS: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
    background: #f6f4ef;
    color: #222;
    line-height: 1.4;
}

.container {
    max-width: 1100px;
    margin: 0 auto;
    padding: 32px 20px 60px;
}

h1 {
    font-size: 2.2em;
    font-weight: 800;
}

h2 {
    font-size: 1.15em;
    margin: 28px 0 10px;
}

.subtitle {
    color: #777;
    margin-bottom: 20px;
}

.hint {
    color: #666;
    font-size: 0.85em;
    margin-bottom: 6px;
}

section {
    background: #fff;
    border: 1px solid #e2ded5;
    border-radius: 8px;
    padding: 16px 20px 20px;
    margin-bottom: 16px;
}

section h2 {
    margin-top: 0;
}

textarea {
    width: 100%;
    font-family: inherit;
    font-size: 0.95em;
    padding: 8px;
    border: 1px solid #ccc;
    border-radius: 4px;
}

.row {
    display: flex;
    flex-wrap: wrap;
    gap: 24px;
    margin-top: 10px;
}

label {
    display: inline-block;
    margin-top: 8px;
}

input[type="number"], input[type="date"] {
    padding: 4px 6px;
    border: 1px solid #ccc;
    border-radius: 4px;
}

button {
    padding: 6px 14px;
    border: 1px solid #bbb;
    border-radius: 4px;
    background: #fff;
    cursor: pointer;
}

button.primary {
    background: #1f6f50;
    border-color: #1f6f50;
    color: #fff;
    font-size: 1.05em;
    padding: 10px 22px;
}

.banner {
    padding: 10px 14px;
    border-radius: 6px;
    margin-bottom: 16px;
}

.banner.error {
    background: #fde8e8;
    color: #9b1c1c;
}

.banner.warning {
    background: #fff4d6;
    color: #7a5200;
}

.banner.trial {
    background: #e6f0ff;
    color: #1d4e89;
}

.conflicts {
    margin: 6px 0 0 20px;
}

.actions {
    display: flex;
    flex-wrap: wrap;
    align-items: center;
    gap: 14px;
    margin-bottom: 18px;
}

table {
    width: 100%;
    border-collapse: collapse;
    background: #fff;
}

th, td {
    border: 1px solid #e2ded5;
    padding: 6px 8px;
    text-align: left;
    vertical-align: top;
}

tr.weekend th.date {
    color: #b4541a;
}

tr.over td {
    color: #9b1c1c;
}

form.slot {
    display: flex;
    align-items: center;
    gap: 6px;
    margin-bottom: 4px;
}

form.slot.uncovered select {
    background: #fde8e8;
    border-color: #e99;
}

.role {
    font-size: 0.75em;
    color: #666;
    min-width: 70px;
}

@media print {
    body {
        background: #fff;
    }
    .container {
        padding: 0;
    }
}
"#;

const JAVASCRIPT: &str = r#"
function copyChat() {
    const text = document.getElementById('chat-text');
    if (navigator.clipboard) {
        navigator.clipboard.writeText(text.value);
    } else {
        text.select();
        document.execCommand('copy');
    }
}
"#;
