use crate::model::{DisabilityLevel, Student};

/// The demo roster installed by `students.seedDemo` for accounts that
/// have no student list yet.
pub fn demo_students() -> Vec<Student> {
    [
        (
            "1",
            "John Doe",
            12,
            "6th Grade",
            "Autism Spectrum Disorder",
            DisabilityLevel::Moderate,
        ),
        (
            "2",
            "Jane Smith",
            10,
            "4th Grade",
            "Down Syndrome",
            DisabilityLevel::Mild,
        ),
        (
            "3",
            "Michael Johnson",
            14,
            "8th Grade",
            "ADHD",
            DisabilityLevel::Mild,
        ),
        (
            "4",
            "Emily Williams",
            11,
            "5th Grade",
            "Intellectual Disability",
            DisabilityLevel::Severe,
        ),
        (
            "5",
            "David Brown",
            13,
            "7th Grade",
            "Learning Disability",
            DisabilityLevel::Moderate,
        ),
        (
            "6",
            "Sarah Davis",
            9,
            "3rd Grade",
            "Cerebral Palsy",
            DisabilityLevel::Moderate,
        ),
    ]
    .into_iter()
    .map(|(id, name, age, grade, disability, level)| {
        Student::new(
            id.to_string(),
            name.to_string(),
            age,
            grade.to_string(),
            disability.to_string(),
            level,
        )
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_roster_has_six_unique_students() {
        let students = demo_students();
        assert_eq!(students.len(), 6);
        let mut ids: Vec<&str> = students.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn demo_roster_starts_with_john_doe() {
        let students = demo_students();
        assert_eq!(students[0].id, "1");
        assert_eq!(students[0].name, "John Doe");
        assert_eq!(students[0].disability_level, DisabilityLevel::Moderate);
        assert!(students[0].certificates.is_empty());
    }
}
