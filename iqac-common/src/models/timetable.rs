//! Weekly timetables
//!
//! A timetable is the weekly grid of one department, semester, academic
//! year and section. Slots within a grid never overlap in time, and a
//! faculty member is never booked into two overlapping slots across all
//! timetables of the same academic year.

use super::{optional_text, required_text};
use crate::time::{is_valid_academic_year, parse_clock};
use crate::{Error, Result};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::HashSet;
use uuid::Uuid;

/// Highest period number in a day
pub const MAX_PERIOD: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SlotType {
    #[default]
    Lecture,
    Lab,
    Tutorial,
    Break,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub day: Day,
    pub period: u8,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    #[serde(default)]
    pub subject: String,
    pub faculty_id: Option<Uuid>,
    pub room: Option<String>,
    #[serde(default)]
    pub slot_type: SlotType,
}

impl Slot {
    fn times(&self) -> Result<(NaiveTime, NaiveTime)> {
        let start = parse_clock(&self.start_time)
            .ok_or_else(|| Error::invalid(format!("Invalid start_time '{}'", self.start_time)))?;
        let end = parse_clock(&self.end_time)
            .ok_or_else(|| Error::invalid(format!("Invalid end_time '{}'", self.end_time)))?;
        Ok((start, end))
    }

    /// Half-open interval overlap on the same day
    pub fn overlaps(&self, other: &Slot) -> bool {
        if self.day != other.day {
            return false;
        }
        match (self.times(), other.times()) {
            (Ok((s1, e1)), Ok((s2, e2))) => s1 < e2 && s2 < e1,
            _ => false,
        }
    }

    fn normalize(mut self) -> Result<Self> {
        if !(1..=MAX_PERIOD).contains(&self.period) {
            return Err(Error::invalid(format!(
                "period must be between 1 and {}",
                MAX_PERIOD
            )));
        }
        let (start, end) = self.times()?;
        if start >= end {
            return Err(Error::invalid(format!(
                "Slot {:?} period {} ends before it starts",
                self.day, self.period
            )));
        }
        self.start_time = start.format("%H:%M").to_string();
        self.end_time = end.format("%H:%M").to_string();

        self.subject = if self.slot_type == SlotType::Break {
            optional_text("subject", Some(self.subject.as_str()), 120)?
                .unwrap_or_else(|| "Break".into())
        } else {
            required_text("subject", &self.subject, 120)?
        };
        if self.slot_type == SlotType::Break {
            self.faculty_id = None;
        }
        self.room = optional_text("room", self.room.as_deref(), 40)?;
        Ok(self)
    }
}

/// Normalize a grid: validate every slot, sort by day and start time, and
/// reject duplicate periods or overlapping slots
pub fn validate_slots(slots: Vec<Slot>) -> Result<Vec<Slot>> {
    let mut slots = slots
        .into_iter()
        .map(Slot::normalize)
        .collect::<Result<Vec<_>>>()?;

    // HH:MM strings sort chronologically
    slots.sort_by(|a, b| (a.day, &a.start_time).cmp(&(b.day, &b.start_time)));

    let mut seen = HashSet::new();
    for slot in &slots {
        if !seen.insert((slot.day, slot.period)) {
            return Err(Error::invalid(format!(
                "Duplicate slot for {:?} period {}",
                slot.day, slot.period
            )));
        }
    }

    for pair in slots.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(Error::invalid(format!(
                "Slots overlap on {:?}: {}-{} and {}-{}",
                pair[0].day,
                pair[0].start_time,
                pair[0].end_time,
                pair[1].start_time,
                pair[1].end_time
            )));
        }
    }

    Ok(slots)
}

/// A faculty member booked into overlapping slots of two timetables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacultyClash {
    pub faculty_id: Uuid,
    pub day: Day,
    pub start_time: String,
    pub end_time: String,
    pub other_timetable_id: Uuid,
}

/// First slot of `slots` whose faculty is already busy in another timetable
pub fn find_faculty_clash(slots: &[Slot], others: &[Timetable]) -> Option<FacultyClash> {
    for slot in slots {
        let Some(faculty_id) = slot.faculty_id else {
            continue;
        };
        for other in others {
            let busy = other
                .slots
                .0
                .iter()
                .any(|o| o.faculty_id == Some(faculty_id) && o.overlaps(slot));
            if busy {
                return Some(FacultyClash {
                    faculty_id,
                    day: slot.day,
                    start_time: slot.start_time.clone(),
                    end_time: slot.end_time.clone(),
                    other_timetable_id: other.id,
                });
            }
        }
    }
    None
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Timetable {
    pub id: Uuid,
    pub department_id: Uuid,
    pub semester: i64,
    pub academic_year: String,
    /// Empty when the grid covers the whole semester
    pub section: String,
    pub slots: Json<Vec<Slot>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub department_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimetableInput {
    pub department_id: Uuid,
    pub semester: i64,
    /// Blank means the configured current academic year
    #[serde(default)]
    pub academic_year: String,
    pub section: Option<String>,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

impl TimetableInput {
    pub fn validate(mut self) -> Result<Self> {
        if !(1..=10).contains(&self.semester) {
            return Err(Error::invalid("semester must be between 1 and 10"));
        }
        self.academic_year = self.academic_year.trim().to_string();
        if !is_valid_academic_year(&self.academic_year) {
            return Err(Error::invalid(format!(
                "Invalid academic year '{}'",
                self.academic_year
            )));
        }
        self.section = Some(
            optional_text("section", self.section.as_deref(), 10)?
                .map(|s| s.to_uppercase())
                .unwrap_or_default(),
        );
        self.slots = validate_slots(std::mem::take(&mut self.slots))?;
        Ok(self)
    }
}
