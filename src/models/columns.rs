//! Column headers of the input rosters and output reports.

pub const AUTHORITY: &str = "招录机关";
pub const POSITION_CODE: &str = "职位代码";
pub const DEPARTMENT: &str = "用人司局";
pub const NAME: &str = "姓名";

// Original roster
pub const POSITION_TITLE: &str = "招考职位";
pub const MIN_INTERVIEW_SCORE: &str = "最低面试分数";

// Backfill roster
pub const BACKFILL_AUTHORITY: &str = "部门名称";
pub const BACKFILL_MIN_SCORE: &str = "递补入围面试最低分数";

// Admission roster
pub const PROPOSED_POSITION: &str = "拟录用职位";
pub const RECRUITING_TITLE: &str = "招录职位";

// Report-only
pub const ORIGINAL_COUNT: &str = "原始进面人数";
pub const BACKFILL_COUNT: &str = "递补进面人数";
pub const SCORE_DELTA: &str = "分数线变化";
pub const HIRED_COUNT: &str = "递补录用人数";
pub const HIRED_NAMES: &str = "递补录用人员";

/// Written wherever a value is missing or cannot be computed
pub const PLACEHOLDER: &str = "--";

/// Separator between hired backfill names
pub const NAME_DELIMITER: &str = "、";
