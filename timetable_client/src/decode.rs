//! Decoding of the solver's compact day/period schedule into lesson records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::{Day, LessonRecord};

/// Slot value for a period without a lesson.
pub const FREE_SLOT: &str = "free";

/// Per-owner week: day code -> slot strings in period order.
pub type WeekSlots = BTreeMap<String, Vec<String>>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct RawTimetable {
    pub classes: BTreeMap<String, WeekSlots>,
    pub teachers: BTreeMap<String, WeekSlots>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedTimetable {
    pub class_names: Vec<String>,
    pub teacher_names: Vec<String>,
    pub num_periods: u32,
    pub lessons: Vec<LessonRecord>,
}

/// Decode the `result` object of a finished job.
pub fn decode_result(result: &serde_json::Value) -> Result<DecodedTimetable, DecodeError> {
    let raw = RawTimetable::deserialize(result).map_err(|e| DecodeError::Shape(e.to_string()))?;
    decode(&raw)
}

pub fn decode(raw: &RawTimetable) -> Result<DecodedTimetable, DecodeError> {
    for (teacher, week) in &raw.teachers {
        ordered_days(teacher, week)?;
    }

    let mut counter: u32 = 0;
    let mut num_periods = None;
    let mut lessons = Vec::new();

    for (class_name, week) in &raw.classes {
        for (day, slots) in ordered_days(class_name, week)? {
            num_periods.get_or_insert(slots.len());
            for (index, slot) in slots.iter().enumerate() {
                // Every slot consumes an id, free ones included.
                counter += 1;
                if slot == FREE_SLOT {
                    continue;
                }
                let period = index as u32 + 1;
                let (subject, teacher) =
                    parse_slot(slot).ok_or_else(|| DecodeError::MalformedSlot {
                        class_name: class_name.clone(),
                        day: day.to_string(),
                        period,
                        slot: slot.clone(),
                    })?;
                lessons.push(LessonRecord {
                    id: counter,
                    day,
                    period,
                    class_name: class_name.clone(),
                    subject: subject.to_string(),
                    teacher_name: teacher.to_string(),
                });
            }
        }
    }

    Ok(DecodedTimetable {
        class_names: raw.classes.keys().cloned().collect(),
        teacher_names: raw.teachers.keys().cloned().collect(),
        num_periods: num_periods.unwrap_or(0) as u32,
        lessons,
    })
}

/// Splits `"<subject> (<teacher>)"`.
pub fn parse_slot(slot: &str) -> Option<(&str, &str)> {
    let (subject, rest) = slot.split_once(' ')?;
    let teacher = rest.strip_prefix('(')?.strip_suffix(')')?;
    if subject.is_empty() || subject == FREE_SLOT || teacher.trim().is_empty() {
        return None;
    }
    Some((subject, teacher))
}

fn ordered_days<'a>(
    owner: &str,
    week: &'a WeekSlots,
) -> Result<Vec<(Day, &'a Vec<String>)>, DecodeError> {
    if let Some(code) = week.keys().find(|code| Day::from_code(code).is_none()) {
        return Err(DecodeError::UnknownDay {
            owner: owner.to_string(),
            code: code.clone(),
        });
    }
    Ok(Day::ALL
        .into_iter()
        .filter_map(|day| week.get(day.code()).map(|slots| (day, slots)))
        .collect())
}
