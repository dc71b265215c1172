pub(crate) const DEFAULT_DIFFICULTY: &str = "Standard";
pub(crate) const DIFFICULTY_LEVELS: &[&str] = &["Standard", "Hard", "Olympiad/Ranker"];

const GENERAL_EXAMS: &[&str] = &["JEE Mains", "NEET UG", "UPSC CSE", "GATE"];
const SCHOOL_EXAMS: &[&str] = &["JEE Mains", "JEE Advanced", "NEET UG", "CLAT", "Boards"];
const COLLEGE_EXAMS: &[&str] = &["UPSC CSE", "GATE", "CAT", "SSC CGL", "IBPS PO", "GRE"];

/// Exams offered on the setup screen for a learner's education level
/// (e.g. "Class 11", "Undergraduate").
pub(crate) fn available_exams(education_level: Option<&str>) -> &'static [&'static str] {
    match education_level.map(str::trim).filter(|level| !level.is_empty()) {
        None => GENERAL_EXAMS,
        Some(level) if level.contains("Class") => SCHOOL_EXAMS,
        Some(_) => COLLEGE_EXAMS,
    }
}
