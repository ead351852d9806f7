//! Renders competition records into an iCalendar.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use ical::{
    generator::{IcalCalendar, IcalCalendarBuilder, IcalEvent, Property},
    ical_param, ical_property,
    parser::ical::component::IcalAlarm,
};
use regex::Regex;

use crate::{
    config::CalendarConfig,
    error::{Error, Result},
    record::CompetitionRecord,
};

pub mod emit;

static DATE_FORMAT: &str = "%Y-%m-%d";
static LOCAL_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
static ICAL_LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
static ICAL_UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";
/// Placeholder the crawler writes for organizers without an address.
static NO_EMAIL: &str = "no-email";

/// Competitions are shown from this hour on their first day …
pub const COMPETITION_START_HOUR: u32 = 7;
/// … until this hour on their last day.
pub const COMPETITION_END_HOUR: u32 = 18;
pub const REMINDER_LEAD_MINUTES: i64 = 15;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// When the registration of a competition opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOpen {
    /// Stored with an offset.
    Utc(DateTime<Utc>),
    /// Stored without an offset, taken as calendar local time.
    Local(NaiveDateTime),
}

impl RegistrationOpen {
    pub fn parse(value: &str) -> Option<Self> {
        if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
            return Some(Self::Utc(date_time.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(value, LOCAL_DATE_TIME_FORMAT)
            .ok()
            .map(Self::Local)
    }
}

/// The parts of a record which end up in the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Competition<'a> {
    id: &'a str,
    name: &'a str,
    city: &'a str,
    venue_address: &'a str,
    url: &'a str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    registration_open: RegistrationOpen,
    organizer_email: Option<&'a str>,
}

impl<'a> Competition<'a> {
    fn from_record(record: &'a CompetitionRecord) -> Result<Self> {
        let registration_open = record.field("registration_open")?;
        Ok(Self {
            id: record.field("id")?,
            name: record.field("name")?,
            city: record.field("city")?,
            venue_address: record.field("venue_address")?,
            url: record.field("url")?,
            start: day_at(record, "start_date", COMPETITION_START_HOUR)?,
            end: day_at(record, "end_date", COMPETITION_END_HOUR)?,
            registration_open: RegistrationOpen::parse(registration_open).ok_or_else(|| {
                Error::InvalidDateTime {
                    field: String::from("registration_open"),
                    id: String::from(record.id()),
                    value: String::from(registration_open),
                }
            })?,
            organizer_email: record.optional("organizer").and_then(first_email),
        })
    }

    fn summary(&self) -> String {
        format!("{} in {}", self.name, self.city)
    }

    fn registration_summary(&self) -> String {
        format!("Registration for {} in {}", self.name, self.city)
    }

    fn organizer(&self, config: &CalendarConfig) -> Property {
        let email = self
            .organizer_email
            .map(String::from)
            .unwrap_or_else(|| config.organizer_email());
        ical_property!(
            "ORGANIZER",
            format!("mailto:{email}"),
            ical_param!("CN", format!("{} Organization Team", self.name))
        )
    }
}

/// Build the calendar with two events per record, in record order.
pub fn get_calendar(
    config: &CalendarConfig,
    display_name: &str,
    records: &[CompetitionRecord],
) -> Result<IcalCalendar> {
    let stamp = Utc::now().format(ICAL_UTC_FORMAT).to_string();
    let mut calendar = IcalCalendarBuilder::version("2.0")
        .gregorian()
        .prodid(config.prod_id())
        .build();
    calendar.properties.extend([
        ical_property!("NAME", escape_text(display_name)),
        ical_property!("X-WR-CALNAME", escape_text(display_name)),
        ical_property!("X-WR-TIMEZONE", config.timezone.as_str()),
    ]);
    for record in records {
        let competition = Competition::from_record(record)?;
        calendar
            .events
            .push(competition_event(&competition, config, &stamp));
        calendar
            .events
            .push(registration_event(&competition, config, &stamp));
    }
    Ok(calendar)
}

fn competition_event(competition: &Competition, config: &CalendarConfig, stamp: &str) -> IcalEvent {
    let mut event = IcalEvent::new();
    event.properties = vec![
        ical_property!("UID", uid(competition.id, None, &config.domain)),
        ical_property!("DTSTAMP", stamp),
        ical_property!(
            "DTSTART",
            competition.start.format(ICAL_LOCAL_FORMAT).to_string(),
            ical_param!("TZID", config.timezone.as_str())
        ),
        ical_property!(
            "DTEND",
            competition.end.format(ICAL_LOCAL_FORMAT).to_string(),
            ical_param!("TZID", config.timezone.as_str())
        ),
        ical_property!("SUMMARY", escape_text(&competition.summary())),
        competition.organizer(config),
        ical_property!("LOCATION", escape_text(competition.venue_address)),
        ical_property!("DESCRIPTION", escape_text(competition.name)),
        ical_property!("URL", competition.url),
    ];
    event
}

/// The registration event has no end and carries the reminder.
fn registration_event(
    competition: &Competition,
    config: &CalendarConfig,
    stamp: &str,
) -> IcalEvent {
    let summary = competition.registration_summary();
    let start = match competition.registration_open {
        RegistrationOpen::Utc(date_time) => ical_property!(
            "DTSTART",
            date_time.format(ICAL_UTC_FORMAT).to_string()
        ),
        RegistrationOpen::Local(date_time) => ical_property!(
            "DTSTART",
            date_time.format(ICAL_LOCAL_FORMAT).to_string(),
            ical_param!("TZID", config.timezone.as_str())
        ),
    };
    let mut event = IcalEvent::new();
    event.properties = vec![
        ical_property!(
            "UID",
            uid(competition.id, Some("registration"), &config.domain)
        ),
        ical_property!("DTSTAMP", stamp),
        start,
        ical_property!("SUMMARY", escape_text(&summary)),
        competition.organizer(config),
        ical_property!(
            "LOCATION",
            escape_text(&format!("{}/register", competition.url))
        ),
        ical_property!(
            "DESCRIPTION",
            escape_text(&format!("Registration {}", competition.name))
        ),
        ical_property!("URL", competition.url),
    ];
    event.alarms.push(reminder(&summary));
    event
}

fn reminder(summary: &str) -> IcalAlarm {
    let mut alarm = IcalAlarm::new();
    alarm.properties = vec![
        ical_property!("ACTION", "DISPLAY"),
        ical_property!("TRIGGER", format!("-PT{REMINDER_LEAD_MINUTES}M")),
        ical_property!("DESCRIPTION", escape_text(summary)),
    ];
    alarm
}

fn day_at(record: &CompetitionRecord, field: &str, hour: u32) -> Result<NaiveDateTime> {
    let value = record.field(field)?;
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .ok_or_else(|| Error::InvalidDate {
            field: String::from(field),
            id: String::from(record.id()),
            value: String::from(value),
        })
}

/// Escape a TEXT value, so it cannot end its content line.
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            c => escaped.push(c),
        }
    }
    escaped
}

/// The first real address of the comma separated organizer list.
fn first_email(organizers: &str) -> Option<&str> {
    organizers
        .split(',')
        .map(str::trim)
        .find(|email| !email.is_empty() && *email != NO_EMAIL)
}

/// Get a unique id for an event of a competition.
///
/// Calendar clients track events by this id, so changing it duplicates every subscribed event.
fn uid(id: &str, kind: Option<&str>, domain: &str) -> String {
    let id = WHITESPACE.replace_all(id, "-");
    match kind {
        Some(kind) => format!("{id}-{kind}@{domain}"),
        None => format!("{id}@{domain}"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Cursor};

    use chrono::{Duration, NaiveDateTime};
    use ical::{
        generator::{IcalCalendar, IcalEvent},
        IcalParser,
    };

    use crate::{
        calendar::{emit, escape_text, get_calendar, uid, RegistrationOpen},
        config::CalendarConfig,
        error::Error,
        record::CompetitionRecord,
    };

    fn get_test_record(id: &str, name: &str, city: &str) -> CompetitionRecord {
        CompetitionRecord::from_iter(
            [
                ("id", id),
                ("region", "FR"),
                ("name", name),
                ("city", city),
                ("venue_address", "1 Place de la Concorde"),
                ("url", "https://www.worldcubeassociation.org/competitions/Worlds2024"),
                ("start_date", "2024-06-01"),
                ("end_date", "2024-06-03"),
                ("registration_open", "2024-03-01T10:00:00"),
            ]
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string())),
        )
    }

    fn with_field(record: &CompetitionRecord, name: &str, value: &str) -> CompetitionRecord {
        let mut fields: Vec<(String, String)> = [
            "id",
            "region",
            "name",
            "city",
            "venue_address",
            "url",
            "start_date",
            "end_date",
            "registration_open",
            "organizer",
        ]
        .into_iter()
        .filter_map(|field| Some((field.to_string(), record.optional(field)?.to_string())))
        .filter(|(field, _)| field != name)
        .collect();
        fields.push((name.to_string(), value.to_string()));
        CompetitionRecord::from_iter(fields)
    }

    fn property_value<'a>(event: &'a IcalEvent, name: &str) -> &'a str {
        event
            .properties
            .iter()
            .find(|property| property.name == name)
            .unwrap()
            .value
            .as_ref()
            .unwrap()
    }

    fn has_param(event: &IcalEvent, name: &str, param: &str, value: &str) -> bool {
        event
            .properties
            .iter()
            .find(|property| property.name == name)
            .and_then(|property| property.params.as_ref())
            .is_some_and(|params| {
                params
                    .iter()
                    .any(|(key, values)| key == param && values.iter().any(|v| v == value))
            })
    }

    fn parse_local(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").unwrap()
    }

    /// Parse a `-PT<minutes>M` trigger into its lead time.
    fn trigger_lead(trigger: &str) -> Duration {
        let minutes = trigger
            .strip_prefix("-PT")
            .and_then(|rest| rest.strip_suffix('M'))
            .unwrap();
        Duration::minutes(minutes.parse().unwrap())
    }

    fn parse(ics: String) -> Vec<IcalCalendar> {
        let parsed: Vec<IcalCalendar> = IcalParser::new(BufReader::new(Cursor::new(ics)))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(parsed.len(), 1);
        parsed
    }

    fn generate(records: &[CompetitionRecord]) -> IcalCalendar {
        get_calendar(
            &CalendarConfig::default(),
            "Competition Calendar for FR,",
            records,
        )
        .unwrap()
    }

    #[test]
    fn test_get_calendar_single_competition() {
        let calendar = generate(&[get_test_record("Worlds2024", "Worlds", "Paris")]);
        assert_eq!(calendar.events.len(), 2);

        let competition = &calendar.events[0];
        assert_eq!(property_value(competition, "DTSTART"), "20240601T070000");
        assert_eq!(property_value(competition, "DTEND"), "20240603T180000");
        assert!(has_param(competition, "DTSTART", "TZID", "Europe/Berlin"));
        assert_eq!(property_value(competition, "SUMMARY"), "Worlds in Paris");
        assert_eq!(
            property_value(competition, "LOCATION"),
            "1 Place de la Concorde"
        );
        assert_eq!(property_value(competition, "DESCRIPTION"), "Worlds");
        assert_eq!(
            property_value(competition, "ORGANIZER"),
            "mailto:noreply@cal.ffgti.org"
        );
        assert!(has_param(
            competition,
            "ORGANIZER",
            "CN",
            "Worlds Organization Team"
        ));
        assert!(competition.alarms.is_empty());

        let registration = &calendar.events[1];
        assert_eq!(property_value(registration, "DTSTART"), "20240301T100000");
        assert!(registration
            .properties
            .iter()
            .all(|property| property.name != "DTEND"));
        assert_eq!(
            property_value(registration, "SUMMARY"),
            "Registration for Worlds in Paris"
        );
        assert_eq!(
            property_value(registration, "LOCATION"),
            "https://www.worldcubeassociation.org/competitions/Worlds2024/register"
        );
        assert_eq!(
            property_value(registration, "DESCRIPTION"),
            "Registration Worlds"
        );
        assert_eq!(registration.alarms.len(), 1);
    }

    #[test]
    fn test_get_calendar_reminder() {
        let calendar = generate(&[get_test_record("Worlds2024", "Worlds", "Paris")]);
        let registration = &calendar.events[1];
        let alarm = &registration.alarms[0];
        let alarm_value = |name: &str| {
            alarm
                .properties
                .iter()
                .find(|property| property.name == name)
                .and_then(|property| property.value.clone())
                .unwrap()
        };
        assert_eq!(alarm_value("ACTION"), "DISPLAY");
        let lead = trigger_lead(&alarm_value("TRIGGER"));
        assert_eq!(lead.num_seconds(), 900);
        let fires_at = parse_local(property_value(registration, "DTSTART")) - lead;
        assert_eq!(fires_at, parse_local("20240301T094500"));
    }

    #[test]
    fn test_get_calendar_event_and_alarm_counts() {
        let records: Vec<CompetitionRecord> = (0..3)
            .map(|i| get_test_record(&format!("Open{i}"), &format!("Open {i}"), "Lyon"))
            .collect();
        let calendar = generate(&records);
        assert_eq!(calendar.events.len(), 6);
        let alarms: usize = calendar.events.iter().map(|event| event.alarms.len()).sum();
        assert_eq!(alarms, 3);
        for pair in calendar.events.chunks(2) {
            assert!(pair[0].alarms.is_empty());
            assert_eq!(pair[1].alarms.len(), 1);
            assert!(property_value(&pair[1], "SUMMARY").starts_with("Registration for "));
        }
    }

    #[test]
    fn test_get_calendar_empty() {
        let calendar = generate(&[]);
        assert!(calendar.events.is_empty());
        let ics = emit::generate(&calendar);
        assert!(ics.starts_with("BEGIN:VCALENDAR"));
        assert!(ics.trim_end().ends_with("END:VCALENDAR"));
        assert!(ics.contains("X-WR-CALNAME:Competition Calendar for FR"));
        assert!(!ics.contains("BEGIN:VEVENT"));
    }

    #[test]
    fn test_get_calendar_round_trip() {
        let records = [
            get_test_record("Worlds2024", "Worlds", "Paris"),
            get_test_record("Lyon Open 2024", "Lyon Open", "Lyon"),
        ];
        let calendar = generate(&records);
        let parsed = parse(emit::generate(&calendar));
        assert_eq!(parsed.len(), 1);
        let parsed = &parsed[0];
        assert_eq!(parsed.events.len(), calendar.events.len());
        for (parsed_event, event) in parsed.events.iter().zip(&calendar.events) {
            for name in ["DTSTART", "SUMMARY", "UID"] {
                assert_eq!(
                    property_value(parsed_event, name),
                    property_value(event, name)
                );
            }
            assert_eq!(parsed_event.alarms.len(), event.alarms.len());
        }
    }

    #[test]
    fn test_get_calendar_registration_with_offset() {
        let record = get_test_record("Worlds2024", "Worlds", "Paris");
        let record = with_field(&record, "registration_open", "2024-03-01T10:00:00+01:00");
        let calendar = generate(&[record]);
        let registration = &calendar.events[1];
        assert_eq!(property_value(registration, "DTSTART"), "20240301T090000Z");
        assert!(!has_param(registration, "DTSTART", "TZID", "Europe/Berlin"));
    }

    #[test]
    fn test_get_calendar_organizer_from_record() {
        let record = get_test_record("Worlds2024", "Worlds", "Paris");
        let record = with_field(&record, "organizer", "no-email, orga@example.org");
        let calendar = generate(&[record]);
        assert_eq!(
            property_value(&calendar.events[0], "ORGANIZER"),
            "mailto:orga@example.org"
        );
    }

    #[test]
    fn test_get_calendar_invalid_dates() {
        let record = get_test_record("Worlds2024", "Worlds", "Paris");
        let err = get_calendar(
            &CalendarConfig::default(),
            "",
            &[with_field(&record, "start_date", "June 1st")],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDate { ref field, .. } if field == "start_date"));

        let err = get_calendar(
            &CalendarConfig::default(),
            "",
            &[with_field(&record, "registration_open", "soon")],
        )
        .unwrap_err();
        assert!(
            matches!(err, Error::InvalidDateTime { ref value, .. } if value == "soon")
        );
    }

    #[test]
    fn test_get_calendar_escapes_text() {
        let record = get_test_record("Worlds2024", "Worlds", "Paris");
        let record = with_field(
            &record,
            "venue_address",
            "Hall 1, Paris\nEND:VEVENT\nBEGIN:VEVENT\nSUMMARY:x; y\\z",
        );
        let calendar = generate(&[record]);
        assert_eq!(
            property_value(&calendar.events[0], "LOCATION"),
            "Hall 1\\, Paris\\nEND:VEVENT\\nBEGIN:VEVENT\\nSUMMARY:x\\; y\\\\z"
        );
        let ics = emit::generate(&calendar);
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
        assert_eq!(parse(ics)[0].events.len(), 2);
    }

    #[test]
    fn test_get_calendar_non_ascii() {
        let record = get_test_record("Tokyo2024", "東京: Open", "東京");
        let record = with_field(
            &record,
            "venue_address",
            "東京都立産業貿易センター浜松町館 東京都港区海岸一丁目7番1号 4階 展示室",
        );
        let calendar = generate(&[record]);
        let ics = emit::generate(&calendar);
        for line in ics.split("\r\n") {
            assert!(line.len() <= 75, "{line}");
        }
        let unfolded = ics.replace("\r\n ", "");
        assert!(unfolded.contains(
            "\r\nLOCATION:東京都立産業貿易センター浜松町館 東京都港区海岸一丁目7番1号 4階 展示室\r\n"
        ));
        assert!(unfolded.contains("\r\nSUMMARY:東京: Open in 東京\r\n"));
        assert!(unfolded.contains("ORGANIZER;CN=\"東京: Open Organization Team\":mailto:"));
        assert_eq!(unfolded.matches("BEGIN:VEVENT").count(), 2);
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a,b;c\\d\r\ne"), "a\\,b\\;c\\\\d\\ne");
        assert_eq!(escape_text("Worlds in Paris"), "Worlds in Paris");
    }

    #[test]
    fn test_registration_open_parse() {
        assert_eq!(
            RegistrationOpen::parse("2024-03-01T10:00:00.500"),
            Some(RegistrationOpen::Local(
                parse_local("20240301T100000") + Duration::milliseconds(500)
            ))
        );
        assert_eq!(RegistrationOpen::parse("2024-03-01"), None);
    }

    #[test]
    fn test_uid() {
        assert_eq!(
            uid("Lyon Open  2024", Some("registration"), "cal.ffgti.org"),
            "Lyon-Open-2024-registration@cal.ffgti.org"
        );
        assert_eq!(uid("Worlds2024", None, "example.org"), "Worlds2024@example.org");
    }
}
