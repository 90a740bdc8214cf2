use crate::{Day, TimetableJobState};

/// Week grid for one class or teacher: `cells[period][day]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleGrid {
    pub title: String,
    pub cells: Vec<[Option<String>; 5]>,
}

impl ScheduleGrid {
    fn empty(title: String, periods: u32) -> Self {
        Self {
            title,
            cells: vec![Default::default(); periods as usize],
        }
    }

    fn put(&mut self, day: Day, period: u32, text: String) {
        let row = period.saturating_sub(1) as usize;
        if row >= self.cells.len() {
            self.cells.resize(row + 1, Default::default());
        }
        self.cells[row][day.index()] = Some(text);
    }

    /// Grid of a class, cells showing `Subject (Teacher)`.
    pub fn for_class(job: &TimetableJobState, class_name: &str) -> Option<Self> {
        if !job.class_names.iter().any(|c| c == class_name) {
            return None;
        }
        let mut grid = Self::empty(format!("Class {class_name}"), job.num_periods);
        for lesson in job.lessons_for_class(class_name) {
            grid.put(
                lesson.day,
                lesson.period,
                format!("{} ({})", lesson.subject, lesson.teacher_name),
            );
        }
        Some(grid)
    }

    /// Grid of a teacher, cells showing `Subject (Class)`.
    pub fn for_teacher(job: &TimetableJobState, teacher_name: &str) -> Option<Self> {
        if !job.teacher_names.iter().any(|t| t == teacher_name) {
            return None;
        }
        let mut grid = Self::empty(format!("Teacher {teacher_name}"), job.num_periods);
        for lesson in job.lessons_for_teacher(teacher_name) {
            grid.put(
                lesson.day,
                lesson.period,
                format!("{} ({})", lesson.subject, lesson.class_name),
            );
        }
        Some(grid)
    }

    pub fn render(&self) -> String {
        let mut widths = [0usize; 5];
        for (i, day) in Day::ALL.iter().enumerate() {
            widths[i] = day.to_string().len();
        }
        for row in &self.cells {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.as_deref().map_or(1, |c| c.chars().count());
                widths[i] = widths[i].max(len);
            }
        }
        let label_width = self.cells.len().to_string().len().max(1);

        let mut out = format!("{}\n", self.title);
        out.push_str(&" ".repeat(label_width));
        for (i, day) in Day::ALL.iter().enumerate() {
            out.push_str(&format!(" | {:<w$}", day.to_string(), w = widths[i]));
        }
        out.push('\n');
        for (row_idx, row) in self.cells.iter().enumerate() {
            out.push_str(&format!("{:>w$}", row_idx + 1, w = label_width));
            for (i, cell) in row.iter().enumerate() {
                out.push_str(&format!(" | {:<w$}", cell.as_deref().unwrap_or("-"), w = widths[i]));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LessonRecord;

    fn job() -> TimetableJobState {
        TimetableJobState {
            exists: true,
            class_names: vec!["1A".into()],
            teacher_names: vec!["Smith".into()],
            num_periods: 2,
            lessons: vec![
                LessonRecord {
                    id: 1,
                    day: Day::Monday,
                    period: 1,
                    class_name: "1A".into(),
                    subject: "Math".into(),
                    teacher_name: "Smith".into(),
                },
                LessonRecord {
                    id: 4,
                    day: Day::Tuesday,
                    period: 2,
                    class_name: "1A".into(),
                    subject: "Art".into(),
                    teacher_name: "Smith".into(),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn class_grid_places_lessons() {
        let grid = ScheduleGrid::for_class(&job(), "1A").unwrap();
        assert_eq!(grid.cells.len(), 2);
        assert_eq!(grid.cells[0][0].as_deref(), Some("Math (Smith)"));
        assert_eq!(grid.cells[1][1].as_deref(), Some("Art (Smith)"));
        assert_eq!(grid.cells[0][1], None);
    }

    #[test]
    fn teacher_grid_shows_classes() {
        let grid = ScheduleGrid::for_teacher(&job(), "Smith").unwrap();
        assert_eq!(grid.cells[0][0].as_deref(), Some("Math (1A)"));
    }

    #[test]
    fn unknown_names_have_no_grid() {
        assert!(ScheduleGrid::for_class(&job(), "9Z").is_none());
        assert!(ScheduleGrid::for_teacher(&job(), "Nobody").is_none());
    }

    #[test]
    fn render_aligns_columns() {
        let text = ScheduleGrid::for_class(&job(), "1A").unwrap().render();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Class 1A");
        assert_eq!(
            lines[1],
            "  | Monday       | Tuesday     | Wednesday | Thursday | Friday"
        );
        assert_eq!(
            lines[2],
            "1 | Math (Smith) | -           | -         | -        | -     "
        );
        assert_eq!(lines.len(), 4);
    }
}
