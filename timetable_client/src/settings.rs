use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::decode::FREE_SLOT;
use crate::error::SettingsError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonRequirement {
    pub subject: String,
    pub teacher: String,
    pub hours_per_week: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntry {
    pub name: String,
    #[serde(default)]
    pub lessons: Vec<LessonRequirement>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TeacherEntry {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SubjectEntry {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    pub periods_per_day: u32,
}

impl Default for Constraints {
    fn default() -> Self {
        Self { periods_per_day: 6 }
    }
}

/// School configuration sent to the settings API before generating.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct SettingsSnapshot {
    #[serde(default)]
    pub classes: Vec<ClassEntry>,
    #[serde(default)]
    pub teachers: Vec<TeacherEntry>,
    #[serde(default)]
    pub subjects: Vec<SubjectEntry>,
    #[serde(default)]
    pub constraints: Constraints,
}

impl SettingsSnapshot {
    pub fn class_count(&self) -> u32 {
        u32::try_from(self.classes.len()).unwrap_or(u32::MAX)
    }

    pub fn weekly_capacity(&self) -> u32 {
        5 * self.constraints.periods_per_day
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.constraints.periods_per_day == 0 {
            return Err(SettingsError::NoPeriods);
        }

        for subject in &self.subjects {
            // Slots are split on the first space, see `decode::parse_slot`.
            if subject.name.contains(char::is_whitespace) || subject.name == FREE_SLOT {
                return Err(SettingsError::InvalidName {
                    kind: "subject",
                    name: subject.name.clone(),
                });
            }
        }

        unique_names("class", self.classes.iter().map(|c| c.name.as_str()))?;
        let teachers = unique_names("teacher", self.teachers.iter().map(|t| t.name.as_str()))?;
        let subjects = unique_names("subject", self.subjects.iter().map(|s| s.name.as_str()))?;

        for class in &self.classes {
            let mut needed = 0;
            for lesson in &class.lessons {
                if !subjects.contains(lesson.subject.as_str()) {
                    return Err(SettingsError::UnknownReference {
                        class_name: class.name.clone(),
                        kind: "subject",
                        name: lesson.subject.clone(),
                    });
                }
                if !teachers.contains(lesson.teacher.as_str()) {
                    return Err(SettingsError::UnknownReference {
                        class_name: class.name.clone(),
                        kind: "teacher",
                        name: lesson.teacher.clone(),
                    });
                }
                needed += lesson.hours_per_week;
            }
            if needed > self.weekly_capacity() {
                return Err(SettingsError::OverCapacity {
                    class_name: class.name.clone(),
                    needed,
                    capacity: self.weekly_capacity(),
                });
            }
        }
        Ok(())
    }
}

fn unique_names<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<HashSet<&'a str>, SettingsError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(SettingsError::InvalidName {
                kind,
                name: name.to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(SettingsError::Duplicate {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SettingsSnapshot {
        SettingsSnapshot {
            classes: vec![ClassEntry {
                name: "1A".into(),
                lessons: vec![LessonRequirement {
                    subject: "Math".into(),
                    teacher: "Smith".into(),
                    hours_per_week: 4,
                }],
            }],
            teachers: vec![TeacherEntry { name: "Smith".into() }],
            subjects: vec![SubjectEntry { name: "Math".into() }],
            constraints: Constraints { periods_per_day: 2 },
        }
    }

    #[test]
    fn valid_snapshot_passes() {
        let settings = sample();
        assert_eq!(settings.class_count(), 1);
        assert_eq!(settings.weekly_capacity(), 10);
        assert_eq!(settings.validate(), Ok(()));
    }

    #[test]
    fn rejects_duplicate_teachers() {
        let mut settings = sample();
        settings.teachers.push(TeacherEntry { name: "Smith".into() });
        assert_eq!(
            settings.validate(),
            Err(SettingsError::Duplicate {
                kind: "teacher",
                name: "Smith".into()
            })
        );
    }

    #[test]
    fn rejects_unknown_teacher() {
        let mut settings = sample();
        settings.classes[0].lessons[0].teacher = "Jones".into();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::UnknownReference { kind: "teacher", .. })
        ));
    }

    #[test]
    fn rejects_demand_above_capacity() {
        let mut settings = sample();
        settings.classes[0].lessons[0].hours_per_week = 11;
        assert_eq!(
            settings.validate(),
            Err(SettingsError::OverCapacity {
                class_name: "1A".into(),
                needed: 11,
                capacity: 10
            })
        );
    }

    #[test]
    fn subject_names_must_fit_slot_encoding() {
        for bad in ["Physical Education", "free", ""] {
            let mut settings = sample();
            settings.subjects[0].name = bad.into();
            settings.classes[0].lessons[0].subject = bad.into();
            assert!(
                matches!(settings.validate(), Err(SettingsError::InvalidName { kind: "subject", .. })),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn rejects_blank_class_name() {
        let mut settings = sample();
        settings.classes[0].name = "  ".into();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidName { kind: "class", .. })
        ));
    }

    #[test]
    fn rejects_zero_periods() {
        let mut settings = sample();
        settings.constraints.periods_per_day = 0;
        assert_eq!(settings.validate(), Err(SettingsError::NoPeriods));
    }

    #[test]
    fn parses_camel_case_json() {
        let json = r#"{
            "classes": [{"name": "2B", "lessons": [{"subject": "Art", "teacher": "Lee", "hoursPerWeek": 2}]}],
            "teachers": [{"name": "Lee"}],
            "subjects": [{"name": "Art"}],
            "constraints": {"periodsPerDay": 5}
        }"#;
        let settings: SettingsSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(settings.classes[0].lessons[0].hours_per_week, 2);
        assert_eq!(settings.constraints.periods_per_day, 5);
    }
}
