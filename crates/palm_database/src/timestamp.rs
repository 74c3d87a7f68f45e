use std::io::{Error, ErrorKind};

fn palm_epoch() -> Result<chrono::NaiveDateTime, Error> {
    chrono::NaiveDate::from_ymd_opt(1904, 1, 1)
        .and_then(|t| t.and_hms_opt(0, 0, 0))
        .ok_or(Error::from(ErrorKind::InvalidData))
}

/// Palm timestamps with the top bit set count unsigned seconds from 1904;
/// others are signed seconds since the Unix epoch.
pub fn from_palm_timestamp(timestamp: u32) -> Result<chrono::NaiveDateTime, Error> {
    if timestamp & 0x8000_0000 != 0 {
        Ok(palm_epoch()? + chrono::Duration::seconds(timestamp as i64))
    } else {
        chrono::DateTime::from_timestamp(timestamp as i64, 0)
            .map(|t| t.naive_utc())
            .ok_or(Error::from(ErrorKind::InvalidData))
    }
}

pub fn to_palm_timestamp(datetime: chrono::NaiveDateTime) -> Result<u32, Error> {
    let duration = datetime.signed_duration_since(palm_epoch()?);
    u32::try_from(duration.num_seconds()).map_err(|_| Error::from(ErrorKind::InvalidData))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_modern_dates() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 17)
            .and_then(|d| d.and_hms_opt(12, 30, 0))
            .unwrap();
        let stamp = to_palm_timestamp(date).unwrap();
        assert!(stamp & 0x8000_0000 != 0);
        assert_eq!(from_palm_timestamp(stamp).unwrap(), date);
    }

    #[test]
    fn unix_style_timestamps_are_accepted() {
        let date = from_palm_timestamp(86_400).unwrap();
        assert_eq!(date.to_string(), "1970-01-02 00:00:00");
    }

    #[test]
    fn dates_before_the_palm_epoch_are_rejected() {
        let date = chrono::NaiveDate::from_ymd_opt(1900, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert!(to_palm_timestamp(date).is_err());
    }
}
