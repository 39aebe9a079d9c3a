//! Built-in goal presets.

use serde::Serialize;
use std::fmt;

use super::TimeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateCategory {
    Health,
    Productivity,
    Learning,
    Sport,
    Habits,
}

impl TemplateCategory {
    pub const ALL: [TemplateCategory; 5] = [
        TemplateCategory::Health,
        TemplateCategory::Productivity,
        TemplateCategory::Learning,
        TemplateCategory::Sport,
        TemplateCategory::Habits,
    ];
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateCategory::Health => write!(f, "Health"),
            TemplateCategory::Productivity => write!(f, "Productivity"),
            TemplateCategory::Learning => write!(f, "Learning"),
            TemplateCategory::Sport => write!(f, "Sport"),
            TemplateCategory::Habits => write!(f, "Habits"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: TemplateCategory,
    pub duration_days: u32,
    pub time_windows: Vec<TimeWindow>,
}

fn template(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: TemplateCategory,
    duration_days: u32,
    windows: &[(u32, u32, u32, u32)],
) -> GoalTemplate {
    GoalTemplate {
        id,
        name,
        description,
        category,
        duration_days,
        time_windows: windows
            .iter()
            .enumerate()
            .map(|(i, &(sh, sm, eh, em))| TimeWindow::new(i as u32, sh, sm, eh, em))
            .collect(),
    }
}

/// All presets, in display order.
pub fn templates() -> Vec<GoalTemplate> {
    use TemplateCategory::*;
    vec![
        template(
            "water_8_glasses",
            "Drink water",
            "Keep a glass of water going through the day",
            Health,
            30,
            &[(8, 0, 20, 0)],
        ),
        template(
            "morning_exercise",
            "Morning exercise",
            "Start the day with a short workout",
            Sport,
            30,
            &[(7, 0, 9, 0)],
        ),
        template(
            "meditation",
            "Meditation",
            "Ten quiet minutes, morning and evening",
            Health,
            21,
            &[(7, 0, 9, 0), (20, 0, 22, 0)],
        ),
        template(
            "reading",
            "Reading",
            "Thirty minutes of reading every evening",
            Learning,
            30,
            &[(19, 0, 23, 0)],
        ),
        template(
            "language_practice",
            "Language practice",
            "Fifteen minutes of practice a day",
            Learning,
            30,
            &[(17, 0, 21, 0)],
        ),
        template(
            "work_focus",
            "Deep work",
            "Two hours of focused work without distractions",
            Productivity,
            14,
            &[(9, 0, 12, 0)],
        ),
        template(
            "no_phone_morning",
            "Phone-free morning",
            "No phone for the first hour after waking up",
            Habits,
            21,
            &[(7, 0, 9, 0)],
        ),
        template(
            "gratitude_journal",
            "Gratitude journal",
            "Write down three things you're grateful for",
            Habits,
            30,
            &[(20, 0, 23, 0)],
        ),
        template(
            "gym_workout",
            "Gym workout",
            "One hour of training every day",
            Sport,
            30,
            &[(18, 0, 21, 0)],
        ),
        template(
            "healthy_breakfast",
            "Healthy breakfast",
            "Start the day with a proper meal",
            Health,
            30,
            &[(7, 0, 10, 0)],
        ),
    ]
}

pub fn template_by_id(id: &str) -> Option<GoalTemplate> {
    templates().into_iter().find(|t| t.id == id)
}

pub fn templates_by_category(category: TemplateCategory) -> Vec<GoalTemplate> {
    templates().into_iter().filter(|t| t.category == category).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::validation::validate_goal;

    #[test]
    fn every_template_is_a_valid_goal() {
        for t in templates() {
            assert!(
                validate_goal(t.name, i64::from(t.duration_days), &t.time_windows).is_ok(),
                "template {} is invalid",
                t.id
            );
        }
    }

    #[test]
    fn ids_are_unique() {
        let all = templates();
        let mut ids: Vec<&str> = all.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), all.len());
    }

    #[test]
    fn lookup_by_id() {
        let meditation = template_by_id("meditation").unwrap();
        assert_eq!(meditation.time_windows.len(), 2);
        assert_eq!(meditation.time_windows[1].index, 1);
        assert!(template_by_id("nope").is_none());
    }

    #[test]
    fn every_category_has_templates() {
        for category in TemplateCategory::ALL {
            assert!(!templates_by_category(category).is_empty(), "{category} is empty");
        }
    }
}
