use anyhow::{Context, Result};
use birdo_common::ObservationRecord;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

use super::types::RawObservation;

/// Parse an eBird `obsDt` value, which may omit the time of day.
pub fn parse_obs_date(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M") {
        return Ok(dt);
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .context(format!("Invalid observation date '{}'", value))?;
    Ok(date.and_time(chrono::NaiveTime::MIN))
}

/// Parse the observation list and keep one record per species.
pub fn parse_observations_json(json: &str) -> Result<Vec<ObservationRecord>> {
    let raw: Vec<RawObservation> =
        serde_json::from_str(json).context("Failed to deserialize eBird observations")?;

    let records = raw
        .into_iter()
        .map(|obs| {
            Ok(ObservationRecord {
                observation_date: parse_obs_date(&obs.obs_dt)?,
                common_name: obs.com_name,
                species_code: obs.species_code,
                location_id: obs.loc_id,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(dedup_by_species(records))
}

/// Keep the most recent record per species code.
///
/// Species keep the position of their first appearance; on equal dates the
/// earlier record stays.
pub fn dedup_by_species(records: Vec<ObservationRecord>) -> Vec<ObservationRecord> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<ObservationRecord> = Vec::new();

    for record in records {
        match slots.get(&record.species_code) {
            Some(&slot) => {
                if record.observation_date > unique[slot].observation_date {
                    unique[slot] = record;
                }
            }
            None => {
                slots.insert(record.species_code.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_obs_date_formats() {
        let with_time = parse_obs_date("2024-05-01 08:15").unwrap();
        assert_eq!(with_time.format("%Y-%m-%d %H:%M").to_string(), "2024-05-01 08:15");

        let date_only = parse_obs_date("2024-05-01").unwrap();
        assert_eq!(date_only.format("%H:%M").to_string(), "00:00");

        assert!(parse_obs_date("yesterday").is_err());
    }

    #[test]
    fn test_parse_json_basic() {
        let json = r#"[
            {"speciesCode":"norcar","comName":"Northern Cardinal","sciName":"Cardinalis cardinalis",
             "locId":"L123","locName":"Patterson Park","obsDt":"2024-05-01 08:15","howMany":2,
             "lat":39.29,"lng":-76.58,"obsValid":true,"obsReviewed":false,"locationPrivate":false,"subId":"S1"},
            {"speciesCode":"blujay","comName":"Blue Jay","locId":"L124","obsDt":"2024-04-30"}
        ]"#;
        let records = parse_observations_json(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].common_name, "Northern Cardinal");
        assert_eq!(records[0].species_code, "norcar");
        assert_eq!(records[0].location_id, "L123");
        assert_eq!(records[1].common_name, "Blue Jay");
    }

    #[test]
    fn test_dedup_keeps_most_recent() {
        let json = r#"[
            {"speciesCode":"comloo","comName":"Common Loon","locId":"L1","obsDt":"2024-04-01 07:00"},
            {"speciesCode":"sora","comName":"Sora","locId":"L2","obsDt":"2024-04-02 07:00"},
            {"speciesCode":"comloo","comName":"Common Loon","locId":"L3","obsDt":"2024-04-05 09:30"},
            {"speciesCode":"comloo","comName":"Common Loon","locId":"L4","obsDt":"2024-04-03"}
        ]"#;
        let records = parse_observations_json(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].species_code, "comloo");
        assert_eq!(records[0].location_id, "L3");
        assert_eq!(records[1].species_code, "sora");
    }

    #[test]
    fn test_dedup_tie_keeps_first() {
        let json = r#"[
            {"speciesCode":"sora","comName":"Sora","locId":"first","obsDt":"2024-04-02 07:00"},
            {"speciesCode":"sora","comName":"Sora","locId":"second","obsDt":"2024-04-02 07:00"}
        ]"#;
        let records = parse_observations_json(json).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].location_id, "first");
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let json = r#"[{"speciesCode":"sora","comName":"Sora","locId":"L1","obsDt":"soon"}]"#;
        assert!(parse_observations_json(json).is_err());
    }
}
