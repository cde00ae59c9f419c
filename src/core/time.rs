use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime, UtcOffset,
};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Accepts RFC 3339 as well as the offset-less `YYYY-MM-DDTHH:MM[:SS]` that
/// HTML `datetime-local` inputs send; the latter is read as UTC.
pub(crate) fn parse_datetime_flexible(raw: &str) -> Option<PrimitiveDateTime> {
    let raw = raw.trim();
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(to_primitive_utc(value));
    }

    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value);
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value);
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Some(value);
    }

    None
}

pub(crate) mod serde_flexible {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use time::PrimitiveDateTime;

    use super::parse_datetime_flexible;

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_datetime_flexible(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
    }

    pub(crate) fn deserialize_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<PrimitiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_datetime_flexible(&raw)
                .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
                .map(Some),
            None => Ok(None),
        }
    }
}
