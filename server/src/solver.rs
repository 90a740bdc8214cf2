//! Greedy timetable solver used by the development backend.
//!
//! Periods are filled day by day for each class, rotating through the class's
//! lesson requirements so a subject is spread over the week. A lesson is only
//! placed when its teacher is still free in that period.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use timetable_client::api::RESULT_SUCCESS;
use timetable_client::decode::{RawTimetable, WeekSlots, FREE_SLOT};
use timetable_client::settings::SettingsSnapshot;
use timetable_client::Day;

pub const RESULT_ERROR: &str = "error";

/// `grid[day][period]`
type Grid = Vec<Vec<String>>;

pub fn solve(settings: &SettingsSnapshot) -> Result<RawTimetable, String> {
    settings.validate().map_err(|e| e.to_string())?;

    let periods = settings.constraints.periods_per_day as usize;
    let empty_grid = || vec![vec![FREE_SLOT.to_string(); periods]; Day::ALL.len()];

    let mut teacher_grids: BTreeMap<String, Grid> = settings
        .teachers
        .iter()
        .map(|t| (t.name.clone(), empty_grid()))
        .collect();
    let mut class_grids = BTreeMap::new();

    for class in &settings.classes {
        let mut grid = empty_grid();
        let mut remaining: Vec<u32> = class.lessons.iter().map(|l| l.hours_per_week).collect();
        let mut cursor = 0;

        for day in 0..Day::ALL.len() {
            for period in 0..periods {
                let candidates = class.lessons.len();
                let pick = (0..candidates).map(|offset| (cursor + offset) % candidates).find(|&i| {
                    remaining[i] > 0
                        && teacher_grids
                            .get(&class.lessons[i].teacher)
                            .is_some_and(|t| t[day][period] == FREE_SLOT)
                });
                let Some(i) = pick else { continue };

                let lesson = &class.lessons[i];
                grid[day][period] = format!("{} ({})", lesson.subject, lesson.teacher);
                if let Some(teacher) = teacher_grids.get_mut(&lesson.teacher) {
                    teacher[day][period] = format!("{} ({})", lesson.subject, class.name);
                }
                remaining[i] -= 1;
                cursor = i + 1;
            }
        }

        if let Some(i) = remaining.iter().position(|&left| left > 0) {
            return Err(format!(
                "could not place {} more {} lessons for class {}",
                remaining[i], class.lessons[i].subject, class.name
            ));
        }
        class_grids.insert(class.name.clone(), grid);
    }

    Ok(RawTimetable {
        classes: class_grids.into_iter().map(|(k, g)| (k, to_week(g))).collect(),
        teachers: teacher_grids.into_iter().map(|(k, g)| (k, to_week(g))).collect(),
    })
}

fn to_week(grid: Grid) -> WeekSlots {
    Day::ALL
        .iter()
        .zip(grid)
        .map(|(day, slots)| (day.code().to_string(), slots))
        .collect()
}

/// Builds the `result` object of a finished job.
pub fn job_result(outcome: Result<RawTimetable, String>) -> Value {
    match outcome {
        Ok(timetable) => json!({
            "status": RESULT_SUCCESS,
            "classes": timetable.classes,
            "teachers": timetable.teachers,
        }),
        Err(message) => json!({
            "status": RESULT_ERROR,
            "message": message,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timetable_client::decode::decode;
    use timetable_client::settings::{
        ClassEntry, Constraints, LessonRequirement, SubjectEntry, TeacherEntry,
    };

    fn lesson(subject: &str, teacher: &str, hours: u32) -> LessonRequirement {
        LessonRequirement {
            subject: subject.into(),
            teacher: teacher.into(),
            hours_per_week: hours,
        }
    }

    fn school(periods: u32) -> SettingsSnapshot {
        SettingsSnapshot {
            classes: vec![
                ClassEntry {
                    name: "1A".into(),
                    lessons: vec![lesson("Math", "Smith", 3), lesson("Art", "Lee", 2)],
                },
                ClassEntry {
                    name: "1B".into(),
                    lessons: vec![lesson("Math", "Smith", 3)],
                },
            ],
            teachers: vec![TeacherEntry { name: "Smith".into() }, TeacherEntry { name: "Lee".into() }],
            subjects: vec![SubjectEntry { name: "Math".into() }, SubjectEntry { name: "Art".into() }],
            constraints: Constraints {
                periods_per_day: periods,
            },
        }
    }

    #[test]
    fn places_every_required_hour() {
        let raw = solve(&school(2)).unwrap();
        let decoded = decode(&raw).unwrap();

        assert_eq!(decoded.class_names, ["1A", "1B"]);
        assert_eq!(decoded.teacher_names, ["Lee", "Smith"]);
        assert_eq!(decoded.num_periods, 2);
        assert_eq!(decoded.lessons.iter().filter(|l| l.class_name == "1A").count(), 5);
        assert_eq!(decoded.lessons.iter().filter(|l| l.class_name == "1B").count(), 3);
        assert_eq!(decoded.lessons.iter().filter(|l| l.teacher_name == "Smith").count(), 6);
    }

    #[test]
    fn never_double_books_a_teacher() {
        let raw = solve(&school(2)).unwrap();
        let decoded = decode(&raw).unwrap();

        let mut seen = std::collections::HashSet::new();
        for l in &decoded.lessons {
            assert!(
                seen.insert((l.teacher_name.clone(), l.day, l.period)),
                "{} teaches twice on {} period {}",
                l.teacher_name,
                l.day,
                l.period
            );
        }
    }

    #[test]
    fn teacher_view_mirrors_class_view() {
        let raw = solve(&school(2)).unwrap();
        for (class_name, week) in &raw.classes {
            for (day, slots) in week {
                for (period, slot) in slots.iter().enumerate() {
                    let Some((subject, teacher)) = slot.split_once(' ') else { continue };
                    let teacher = teacher.trim_start_matches('(').trim_end_matches(')');
                    assert_eq!(
                        raw.teachers[teacher][day][period],
                        format!("{subject} ({class_name})")
                    );
                }
            }
        }
    }

    #[test]
    fn reports_error_when_teacher_is_overbooked() {
        let mut settings = school(1);
        // Smith would need 6 of the 5 periods in the week.
        settings.classes[0].lessons = vec![lesson("Math", "Smith", 3)];
        let err = solve(&settings).unwrap_err();
        assert!(err.contains("1B"), "{err}");

        let result = job_result(Err(err));
        assert_eq!(result["status"], RESULT_ERROR);
    }

    #[test]
    fn rejects_invalid_settings() {
        let mut settings = school(2);
        settings.classes[1].lessons[0].teacher = "Nobody".into();
        assert!(solve(&settings).is_err());
    }

    #[test]
    fn success_result_carries_status() {
        let result = job_result(solve(&school(2)));
        assert_eq!(result["status"], RESULT_SUCCESS);
        assert_eq!(result["classes"]["1A"]["Mo"].as_array().unwrap().len(), 2);
    }
}
