//! Read-only weekly timetable: teacher -> day -> period -> class id.

use crate::annotations::{self, Store};
use crate::config::WeekSettings;
use crate::selection::{is_empty_class, CellRef, Selection};
use anyhow::{anyhow, Context};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

pub const SCHEDULE_FILE_NAME: &str = "teacher_schedules.json";

type DayGrid = BTreeMap<u8, String>;

#[derive(Clone, Debug, Default)]
pub struct Schedule {
    teachers: BTreeMap<String, BTreeMap<String, DayGrid>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub day: String,
    pub period: u8,
    pub class_id: Option<String>,
    pub empty: bool,
    pub selected: bool,
    pub title: String,
}

impl Schedule {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read schedule {}", path.to_string_lossy()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("invalid schedule {}", path.to_string_lossy()))
    }

    /// Parses `{ teacher: { day: { "period": classId | null } } }`.
    /// Null and blank class ids are kept out of the grid.
    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let root: Value = serde_json::from_str(text).context("schedule is not valid JSON")?;
        let root = root
            .as_object()
            .ok_or_else(|| anyhow!("schedule root must be an object"))?;

        let mut teachers = BTreeMap::new();
        for (teacher, days) in root {
            let days = days
                .as_object()
                .ok_or_else(|| anyhow!("schedule for {} must be an object", teacher))?;
            let mut week = BTreeMap::new();
            for (day, periods) in days {
                let periods = periods
                    .as_object()
                    .ok_or_else(|| anyhow!("{}/{} must be an object", teacher, day))?;
                let mut grid = DayGrid::new();
                for (period, class_id) in periods {
                    let p: u8 = period
                        .trim()
                        .parse()
                        .map_err(|_| anyhow!("{}/{}: bad period {:?}", teacher, day, period))?;
                    match class_id {
                        Value::Null => {}
                        Value::String(s) if s.trim().is_empty() => {}
                        Value::String(s) => {
                            grid.insert(p, s.clone());
                        }
                        other => {
                            return Err(anyhow!(
                                "{}/{}/{}: class id must be string or null, got {}",
                                teacher,
                                day,
                                period,
                                other
                            ))
                        }
                    }
                }
                week.insert(day.clone(), grid);
            }
            teachers.insert(teacher.clone(), week);
        }
        Ok(Self { teachers })
    }

    pub fn teachers(&self) -> Vec<String> {
        self.teachers.keys().cloned().collect()
    }

    pub fn has_teacher(&self, teacher: &str) -> bool {
        self.teachers.contains_key(teacher)
    }

    pub fn teacher_count(&self) -> usize {
        self.teachers.len()
    }

    /// Raw class id stored for the cell, placeholder glyphs included.
    pub fn raw_class_at(&self, teacher: &str, day: &str, period: u8) -> Option<&str> {
        self.teachers
            .get(teacher)?
            .get(day)?
            .get(&period)
            .map(|s| s.as_str())
    }

    pub fn class_at(&self, teacher: &str, day: &str, period: u8, placeholder: &str) -> Option<&str> {
        self.raw_class_at(teacher, day, period)
            .filter(|c| !is_empty_class(Some(*c), placeholder))
    }

    /// Like `class_at`, but also finds cells the dataset files under an alias
    /// spelling of `day`.
    pub fn class_for<'a>(
        &'a self,
        teacher: &str,
        day: &str,
        period: u8,
        settings: &WeekSettings,
    ) -> Option<&'a str> {
        let placeholder = settings.empty_placeholder.as_str();
        self.class_at(teacher, day, period, placeholder).or_else(|| {
            settings
                .day_aliases
                .iter()
                .filter(|(_, canonical)| canonical.as_str() == day)
                .find_map(|(alias, _)| self.class_at(teacher, alias, period, placeholder))
        })
    }

    /// Day-major projection of a teacher's week for display.
    pub fn grid(
        &self,
        teacher: &str,
        settings: &WeekSettings,
        selection: &Selection,
        store: &Store,
    ) -> Vec<Vec<GridCell>> {
        settings
            .days
            .iter()
            .map(|day| {
                settings
                    .periods()
                    .map(|period| {
                        let class_id = self.class_for(teacher, day, period, settings);
                        let (selected, title) = match class_id {
                            Some(c) => {
                                let cell = CellRef {
                                    day: day.clone(),
                                    period,
                                    class_id: c.to_string(),
                                };
                                (
                                    selection.contains(day, period, c),
                                    annotations::read_cell(store, &cell).title,
                                )
                            }
                            None => (false, String::new()),
                        };
                        GridCell {
                            day: day.clone(),
                            period,
                            class_id: class_id.map(|c| c.to_string()),
                            empty: class_id.is_none(),
                            selected,
                            title,
                        }
                    })
                    .collect()
            })
            .collect()
    }
}
