//! Serializes a calendar to iCalendar text.
//!
//! Lines are folded at 75 octets without splitting a character, parameter values containing
//! `:`, `;` or `,` are quoted, and no value can end a line early.

use ical::{
    generator::{IcalCalendar, IcalEvent, Property},
    parser::ical::component::IcalAlarm,
};

const MAX_LINE_OCTETS: usize = 75;
static LINE_END: &str = "\r\n";

/// Render the calendar with its events and their alarms.
pub fn generate(calendar: &IcalCalendar) -> String {
    let mut output = String::new();
    output.push_str("BEGIN:VCALENDAR\r\n");
    push_properties(&mut output, &calendar.properties);
    for event in &calendar.events {
        push_event(&mut output, event);
    }
    output.push_str("END:VCALENDAR\r\n");
    output
}

fn push_event(output: &mut String, event: &IcalEvent) {
    output.push_str("BEGIN:VEVENT\r\n");
    push_properties(output, &event.properties);
    for alarm in &event.alarms {
        push_alarm(output, alarm);
    }
    output.push_str("END:VEVENT\r\n");
}

fn push_alarm(output: &mut String, alarm: &IcalAlarm) {
    output.push_str("BEGIN:VALARM\r\n");
    push_properties(output, &alarm.properties);
    output.push_str("END:VALARM\r\n");
}

fn push_properties(output: &mut String, properties: &[Property]) {
    for property in properties {
        output.push_str(&fold(&content_line(property)));
    }
}

fn content_line(property: &Property) -> String {
    let mut line = strip_line_breaks(&property.name);
    for (name, values) in property.params.iter().flatten() {
        line.push(';');
        line.push_str(&strip_line_breaks(name));
        line.push('=');
        let values: Vec<String> = values.iter().map(|value| param_value(value)).collect();
        line.push_str(&values.join(","));
    }
    line.push(':');
    if let Some(value) = &property.value {
        line.push_str(&strip_line_breaks(value));
    }
    line
}

/// Parameter values cannot contain `"`; those with `:`, `;` or `,` must be quoted.
fn param_value(value: &str) -> String {
    let value = strip_line_breaks(value).replace('"', "'");
    if value.contains([':', ';', ',']) {
        format!("\"{value}\"")
    } else {
        value
    }
}

fn strip_line_breaks(value: &str) -> String {
    value.replace(['\r', '\n'], "")
}

/// Fold a content line; continuation lines start with a space, which counts towards the limit.
fn fold(line: &str) -> String {
    let mut folded = String::with_capacity(line.len() + line.len() / 24 + LINE_END.len());
    let mut width = 0;
    for c in line.chars() {
        if width + c.len_utf8() > MAX_LINE_OCTETS {
            folded.push_str(LINE_END);
            folded.push(' ');
            width = 1;
        }
        folded.push(c);
        width += c.len_utf8();
    }
    folded.push_str(LINE_END);
    folded
}
