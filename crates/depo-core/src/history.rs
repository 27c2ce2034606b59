//! # History Recorder
//!
//! Builds the immutable audit record written when a tire leaves the depot or
//! is swapped for a new set.
//!
//! ## Snapshot Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HistoryRecord                                                          │
//! │  ├── customer: name, plate, phone      (copied, not referenced)         │
//! │  ├── action:   Çıkış | Değişim                                          │
//! │  ├── old:      TireSnapshot                                             │
//! │  │             ├── serial_no, brand, season, entry_at                   │
//! │  │             └── slots: [{size, year, brand, season}, ...]            │
//! │  ├── new:      TireSnapshot (Değişim only)                              │
//! │  └── rack_code: old rack (Çıkış) / new rack (Değişim)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is copied by value so the entry still reads correctly after the
//! tire, brand, rack or customer is edited or deleted.

use chrono::{DateTime, Utc};

use crate::types::{HistoryAction, HistoryRecord, SlotSnapshot, TireDetail, TireSnapshot};

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Snapshots the filled slots of a tire.
///
/// A slot is filled when its size is non-blank. Slot brand and season fall
/// back to the tire-level values. When no slot is filled the tire-level size
/// yields a single entry, so the snapshot is only empty for a tire with no
/// size at all.
pub fn snapshot_slots(detail: &TireDetail) -> Vec<SlotSnapshot> {
    let tire = &detail.tire;

    let slots: Vec<SlotSnapshot> = tire
        .slots
        .iter()
        .filter_map(|slot| {
            let size = non_blank(slot.size.as_deref())?;
            Some(SlotSnapshot {
                size: size.to_string(),
                year: non_blank(slot.production_year.as_deref()).map(str::to_string),
                brand: non_blank(slot.brand.as_deref())
                    .unwrap_or(&detail.brand_name)
                    .to_string(),
                season: slot.season.unwrap_or(tire.season),
            })
        })
        .collect();

    if !slots.is_empty() {
        return slots;
    }

    match non_blank(Some(&tire.size)) {
        Some(size) => vec![SlotSnapshot {
            size: size.to_string(),
            year: None,
            brand: detail.brand_name.clone(),
            season: tire.season,
        }],
        None => Vec::new(),
    }
}

impl TireSnapshot {
    /// Freezes one side of a history entry.
    pub fn capture(detail: &TireDetail) -> Self {
        TireSnapshot {
            tire_id: Some(detail.tire.id),
            serial_no: detail.tire.serial_no,
            slots: snapshot_slots(detail),
            brand: detail.brand_name.clone(),
            season: detail.tire.season,
            entry_at: detail.tire.entry_at,
        }
    }
}

impl HistoryRecord {
    /// Record for a tire handed back to its customer.
    pub fn exit(old: &TireDetail, note: Option<String>, at: DateTime<Utc>) -> Self {
        HistoryRecord {
            customer_id: Some(old.tire.customer_id),
            customer_name: old.customer_name.clone(),
            plate: old.customer_plate.clone(),
            phone: old.customer_phone.clone(),
            action: HistoryAction::Exit,
            occurred_at: at,
            old: TireSnapshot::capture(old),
            new: None,
            rack_code: old.rack_code.clone(),
            note,
        }
    }

    /// Record for a tire swapped for `new`. The rack recorded is the one
    /// holding the new set.
    pub fn replace(
        old: &TireDetail,
        new: &TireDetail,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        HistoryRecord {
            customer_id: Some(old.tire.customer_id),
            customer_name: old.customer_name.clone(),
            plate: old.customer_plate.clone(),
            phone: old.customer_phone.clone(),
            action: HistoryAction::Replace,
            occurred_at: at,
            old: TireSnapshot::capture(old),
            new: Some(TireSnapshot::capture(new)),
            rack_code: new.rack_code.clone(),
            note,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Season, Tire, TireSlot, TireStatus, TreadCondition};
    use chrono::TimeZone;

    fn detail(serial_no: i64, rack: &str, slots: Vec<TireSlot>) -> TireDetail {
        TireDetail {
            tire: Tire {
                id: serial_no * 10,
                serial_no,
                customer_id: 3,
                brand_id: 1,
                rack_id: 1,
                size: "205/55 R16".to_string(),
                season: Season::Winter,
                condition: TreadCondition::Good,
                note: None,
                slots,
                status: TireStatus::InDepot,
                entry_at: Utc.with_ymd_and_hms(2024, 11, 2, 9, 30, 0).unwrap(),
                exit_at: None,
            },
            brand_name: "Lassa".to_string(),
            rack_code: rack.to_string(),
            customer_name: "Şeyma Öz".to_string(),
            customer_phone: "05551234567".to_string(),
            customer_plate: "34 SO 34".to_string(),
        }
    }

    #[test]
    fn test_slots_fall_back_to_tire_level() {
        let slots = vec![
            TireSlot {
                size: Some("205/55 R16".to_string()),
                production_year: Some("2321".to_string()),
                brand: None,
                season: None,
            },
            TireSlot {
                size: Some("215/65 R16".to_string()),
                production_year: Some(" ".to_string()),
                brand: Some("Pirelli".to_string()),
                season: Some(Season::AllSeason),
            },
            TireSlot::default(),
        ];
        let snap = snapshot_slots(&detail(1, "A-1", slots));

        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].brand, "Lassa");
        assert_eq!(snap[0].season, Season::Winter);
        assert_eq!(snap[0].year.as_deref(), Some("2321"));
        assert_eq!(snap[1].brand, "Pirelli");
        assert_eq!(snap[1].season, Season::AllSeason);
        assert_eq!(snap[1].year, None);
    }

    #[test]
    fn test_no_filled_slot_uses_tire_size() {
        let snap = snapshot_slots(&detail(1, "A-1", vec![TireSlot::default()]));
        assert_eq!(
            snap,
            vec![SlotSnapshot {
                size: "205/55 R16".to_string(),
                year: None,
                brand: "Lassa".to_string(),
                season: Season::Winter,
            }]
        );

        let mut sizeless = detail(1, "A-1", vec![]);
        sizeless.tire.size = String::new();
        assert!(snapshot_slots(&sizeless).is_empty());
    }

    #[test]
    fn test_exit_record() {
        let old = detail(1, "A-1", vec![]);
        let at = Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap();
        let record = HistoryRecord::exit(&old, Some("müşteri aldı".to_string()), at);

        assert_eq!(record.action, HistoryAction::Exit);
        assert_eq!(record.old_serial_no(), 1);
        assert_eq!(record.new_serial_no(), None);
        assert_eq!(record.rack_code, "A-1");
        assert_eq!(record.customer_name, "Şeyma Öz");
        assert_eq!(record.old.entry_at, old.tire.entry_at);
        assert_eq!(record.occurred_at, at);
    }

    #[test]
    fn test_replace_record_uses_new_rack() {
        let old = detail(2, "A-1", vec![]);
        let new = detail(3, "A-2", vec![]);
        let record = HistoryRecord::replace(&old, &new, None, Utc::now());

        assert_eq!(record.action, HistoryAction::Replace);
        assert_eq!(record.old_serial_no(), 2);
        assert_eq!(record.new_serial_no(), Some(3));
        assert_eq!(record.rack_code, "A-2");
        assert_eq!(record.new.as_ref().and_then(|n| n.tire_id), Some(30));
    }

    #[test]
    fn test_slot_json_shape() {
        let snap = snapshot_slots(&detail(1, "A-1", vec![]));
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "size": "205/55 R16",
                "year": null,
                "brand": "Lassa",
                "season": "KIS"
            }])
        );
    }
}
