use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use serde::de::{self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

// YAML 1.1 timestamp forms: a bare calendar date needs two-digit month and
// day, the date-time form accepts one or two.
static DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").unwrap());

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^([0-9]{4})-([0-9]{1,2})-([0-9]{1,2})",
        r"(?:[Tt]|[ \t]+)([0-9]{1,2}):([0-9]{2}):([0-9]{2})",
        r"(?:\.([0-9]*))?",
        r"(?:[ \t]*(Z|([-+])([0-9]{1,2})(?::([0-9]{2}))?))?$",
    ))
    .unwrap()
});

/// A frontmatter value after parsing.
///
/// Closed over the shapes YAML frontmatter produces so the JSON output is
/// fully determined by this type.
#[derive(Debug, Clone, PartialEq)]
pub enum FrontValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Date(FrontDate),
    List(Vec<FrontValue>),
    /// Entries keep their source order.
    Mapping(Vec<(String, FrontValue)>),
}

impl FrontValue {
    /// Emptiness in the loose sense used for `title` fallback and for
    /// deciding whether a frontmatter block counts at all.
    pub fn is_truthy(&self) -> bool {
        match self {
            FrontValue::Null => false,
            FrontValue::Bool(b) => *b,
            FrontValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            FrontValue::String(s) => !s.is_empty(),
            FrontValue::Date(_) => true,
            FrontValue::List(items) => !items.is_empty(),
            FrontValue::Mapping(entries) => !entries.is_empty(),
        }
    }

    /// Reads a timestamp-shaped string as a date. Anything else is
    /// returned as is.
    pub fn resolve_date(self) -> FrontValue {
        match self {
            FrontValue::String(s) => match FrontDate::parse(&s) {
                Some(date) => FrontValue::Date(date),
                None => FrontValue::String(s),
            },
            other => other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FrontValue::Null)
    }

    /// Looks up `key` in a mapping. Other shapes have no keys.
    pub fn get(&self, key: &str) -> Option<&FrontValue> {
        match self {
            FrontValue::Mapping(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for FrontValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FrontValueVisitor)
    }
}

struct FrontValueVisitor;

impl<'de> Visitor<'de> for FrontValueVisitor {
    type Value = FrontValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a YAML value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<FrontValue, E> {
        Ok(FrontValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<FrontValue, E> {
        Ok(FrontValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<FrontValue, D::Error> {
        FrontValue::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<FrontValue, E> {
        Ok(FrontValue::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> Result<FrontValue, E> {
        Ok(FrontValue::Number(i.into()))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> Result<FrontValue, E> {
        Ok(FrontValue::Number(u.into()))
    }

    fn visit_i128<E: de::Error>(self, i: i128) -> Result<FrontValue, E> {
        match i64::try_from(i) {
            Ok(i) => self.visit_i64(i),
            Err(_) => self.visit_f64(i as f64),
        }
    }

    fn visit_u128<E: de::Error>(self, u: u128) -> Result<FrontValue, E> {
        match u64::try_from(u) {
            Ok(u) => self.visit_u64(u),
            Err(_) => self.visit_f64(u as f64),
        }
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> Result<FrontValue, E> {
        // NaN and infinities have no JSON form.
        Ok(serde_json::Number::from_f64(f).map_or(FrontValue::Null, FrontValue::Number))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<FrontValue, E> {
        Ok(FrontValue::String(s.to_owned()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<FrontValue, E> {
        Ok(FrontValue::String(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<FrontValue, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(FrontValue::List(items))
    }

    /// A repeated key keeps its first position and takes the last value.
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FrontValue, A::Error> {
        let mut entries: Vec<(String, FrontValue)> = Vec::new();
        while let Some((key, value)) = map.next_entry::<FrontValue, FrontValue>()? {
            let key = key_text(key);
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }
        Ok(FrontValue::Mapping(entries))
    }

    // Custom tags (`!foo bar`) arrive as enums; the tag is dropped.
    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<FrontValue, A::Error> {
        let (_tag, contents) = data.variant::<String>()?;
        contents.newtype_variant()
    }
}

fn key_text(key: FrontValue) -> String {
    match key {
        FrontValue::String(s) => s,
        FrontValue::Null => "null".to_string(),
        other => other.to_string(),
    }
}

impl fmt::Display for FrontValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrontValue::Null => Ok(()),
            FrontValue::Bool(b) => write!(f, "{b}"),
            FrontValue::Number(n) => write!(f, "{n}"),
            FrontValue::String(s) => f.write_str(s),
            FrontValue::Date(d) => write!(f, "{d}"),
            FrontValue::List(_) | FrontValue::Mapping(_) => {
                let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&text)
            }
        }
    }
}

impl Serialize for FrontValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FrontValue::Null => serializer.serialize_unit(),
            FrontValue::Bool(b) => serializer.serialize_bool(*b),
            FrontValue::Number(n) => n.serialize(serializer),
            FrontValue::String(s) => serializer.serialize_str(s),
            FrontValue::Date(d) => d.serialize(serializer),
            FrontValue::List(items) => items.serialize(serializer),
            FrontValue::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// A YAML timestamp literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontDate {
    Day(NaiveDate),
    Local(NaiveDateTime),
    Offset(DateTime<FixedOffset>),
}

impl FrontDate {
    /// Recognizes a timestamp literal. Text shaped like a timestamp that
    /// names no real instant (`2024-02-30`, `25:00:00`) is not a date.
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(caps) = DAY.captures(text) {
            return ymd(&caps[1], &caps[2], &caps[3]).map(FrontDate::Day);
        }

        let caps = TIMESTAMP.captures(text)?;
        let date = ymd(&caps[1], &caps[2], &caps[3])?;
        let micros = caps.get(7).map_or(0, |m| fraction_micros(m.as_str()));
        let time = NaiveTime::from_hms_micro_opt(
            digits(&caps[4])?,
            digits(&caps[5])?,
            digits(&caps[6])?,
            micros,
        )?;
        let local = date.and_time(time);

        let offset_secs = match caps.get(8).map(|m| m.as_str()) {
            None => return Some(FrontDate::Local(local)),
            Some("Z") => 0,
            Some(_) => {
                let hours = digits(&caps[10])? as i32;
                let minutes = caps.get(11).map_or(Some(0), |m| digits(m.as_str()))? as i32;
                let secs = hours * 3600 + minutes * 60;
                if &caps[9] == "-" { -secs } else { secs }
            }
        };
        let offset = FixedOffset::east_opt(offset_secs)?;
        local
            .and_local_timezone(offset)
            .single()
            .map(FrontDate::Offset)
    }
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, digits(month)?, digits(day)?)
}

fn digits(text: &str) -> Option<u32> {
    text.parse().ok()
}

// Fractions beyond microseconds are truncated.
fn fraction_micros(fraction: &str) -> u32 {
    let kept: String = fraction.chars().take(6).collect();
    format!("{kept:0<6}").parse().unwrap_or(0)
}

fn write_clock(f: &mut fmt::Formatter<'_>, dt: &NaiveDateTime) -> fmt::Result {
    write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S"))?;
    let micros = dt.nanosecond() / 1_000;
    if micros != 0 {
        write!(f, ".{micros:06}")?;
    }
    Ok(())
}

impl fmt::Display for FrontDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrontDate::Day(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FrontDate::Local(dt) => write_clock(f, dt),
            FrontDate::Offset(dt) => {
                write_clock(f, &dt.naive_local())?;
                write!(f, "{}", dt.format("%:z"))
            }
        }
    }
}

impl Serialize for FrontDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> FrontValue {
        serde_yaml::from_str(text).unwrap()
    }

    fn date_text(text: &str) -> Option<String> {
        FrontDate::parse(text).map(|d| d.to_string())
    }

    #[test]
    fn bare_dates_are_recognized() {
        assert_eq!(date_text("2024-03-01").as_deref(), Some("2024-03-01"));
        assert!(matches!(
            yaml("2024-03-01").resolve_date(),
            FrontValue::Date(FrontDate::Day(_))
        ));
    }

    #[test]
    fn bare_dates_need_two_digit_fields() {
        assert_eq!(date_text("2024-3-1"), None);
    }

    #[test]
    fn impossible_dates_stay_strings() {
        assert_eq!(date_text("2024-02-30"), None);
        assert_eq!(
            yaml("2024-02-30").resolve_date(),
            FrontValue::String("2024-02-30".to_string())
        );
    }

    #[test]
    fn date_times_use_iso_form() {
        assert_eq!(
            date_text("2025-03-19 10:05:00").as_deref(),
            Some("2025-03-19T10:05:00")
        );
        assert_eq!(
            date_text("2025-3-9t07:00:00").as_deref(),
            Some("2025-03-09T07:00:00")
        );
    }

    #[test]
    fn fractions_print_as_microseconds() {
        assert_eq!(
            date_text("2025-03-19T10:05:00.5").as_deref(),
            Some("2025-03-19T10:05:00.500000")
        );
        assert_eq!(
            date_text("2025-03-19T10:05:00.1234567").as_deref(),
            Some("2025-03-19T10:05:00.123456")
        );
        assert_eq!(
            date_text("2025-03-19T10:05:00.000").as_deref(),
            Some("2025-03-19T10:05:00")
        );
    }

    #[test]
    fn offsets_are_kept() {
        assert_eq!(
            date_text("2025-03-19T00:00:00Z").as_deref(),
            Some("2025-03-19T00:00:00+00:00")
        );
        assert_eq!(
            date_text("2025-03-19 08:30:00 -5").as_deref(),
            Some("2025-03-19T08:30:00-05:00")
        );
        assert_eq!(
            date_text("2025-03-19T08:30:00+05:30").as_deref(),
            Some("2025-03-19T08:30:00+05:30")
        );
    }

    #[test]
    fn prose_is_not_a_date() {
        assert_eq!(date_text("Released 2024-03-01"), None);
        assert_eq!(date_text("2024-03-01 sometime"), None);
    }

    #[test]
    fn mappings_keep_source_order() {
        let value = yaml("zeta: 1\nalpha: two\nmid: [a, b]\n");
        let FrontValue::Mapping(entries) = &value else {
            panic!("expected mapping, got {value:?}");
        };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"zeta":1,"alpha":"two","mid":["a","b"]}"#
        );
    }

    #[test]
    fn non_string_keys_become_text() {
        let value = yaml("1: one\ntrue: yes-ish\n");
        assert_eq!(value.get("1"), Some(&FrontValue::String("one".to_string())));
        assert_eq!(value.get("true"), Some(&FrontValue::String("yes-ish".to_string())));
    }

    #[test]
    fn strings_are_not_read_as_dates_unless_asked() {
        let value = yaml("updated: '2024-3-1 7:00:00'\n");
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"updated":"2024-3-1 7:00:00"}"#
        );
        assert_eq!(
            value.get("updated").cloned().unwrap().resolve_date().to_string(),
            "2024-03-01T07:00:00"
        );
    }

    #[test]
    fn resolve_date_leaves_other_shapes_alone() {
        assert_eq!(yaml("7").resolve_date(), FrontValue::Number(7.into()));
        assert_eq!(
            yaml("next week").resolve_date(),
            FrontValue::String("next week".to_string())
        );
    }

    #[test]
    fn repeated_keys_take_the_last_value() {
        let value = yaml("title: A\norder: 1\ntitle: B\n");
        let FrontValue::Mapping(entries) = &value else {
            panic!("expected mapping, got {value:?}");
        };
        assert_eq!(
            entries,
            &[
                ("title".to_string(), FrontValue::String("B".to_string())),
                ("order".to_string(), FrontValue::Number(1.into())),
            ]
        );
    }

    #[test]
    fn repeated_keys_in_nested_mappings_take_the_last_value() {
        let value = yaml("series:\n  name: Old\n  name: New\n");
        assert_eq!(
            value.get("series").and_then(|s| s.get("name")),
            Some(&FrontValue::String("New".to_string()))
        );
    }

    #[test]
    fn tags_are_transparent() {
        assert_eq!(yaml("!custom hello"), FrontValue::String("hello".to_string()));
    }

    #[test]
    fn truthiness_follows_emptiness() {
        assert!(!yaml("~").is_truthy());
        assert!(!yaml("''").is_truthy());
        assert!(!yaml("0").is_truthy());
        assert!(!yaml("0.0").is_truthy());
        assert!(!yaml("false").is_truthy());
        assert!(!yaml("[]").is_truthy());
        assert!(!yaml("{}").is_truthy());
        assert!(yaml("title").is_truthy());
        assert!(yaml("3").is_truthy());
        assert!(yaml("2024-03-01").is_truthy());
    }

    #[test]
    fn scalars_display_as_plain_text() {
        assert_eq!(yaml("42").to_string(), "42");
        assert_eq!(yaml("true").to_string(), "true");
        assert_eq!(yaml("hello").to_string(), "hello");
        assert_eq!(yaml("[a, 1]").to_string(), r#"["a",1]"#);
    }
}
