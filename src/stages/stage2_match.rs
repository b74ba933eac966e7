use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::error::{ReportError, Result};
use crate::models::columns::*;
use crate::models::{
    extract_position_code, AdmissionRow, CellValue, PostingKey, Table, POSITION_CODE_LEN,
};

/// Result of Stage 2 backfill admission matching
#[derive(Debug)]
pub struct Stage2Result {
    /// One row per posting with at least one hired backfill candidate
    pub rows: Vec<AdmissionRow>,
    /// Admission rows whose proposed position carries no position code
    pub admission_rows_without_code: usize,
    /// Backfill rows skipped for a blank authority, position code or name
    pub backfill_rows_without_key: usize,
    /// Total (backfill, admission) matches
    pub matched_candidates: usize,
}

/// Where a descriptive column of the joined record is read from
#[derive(Debug, Clone, Copy)]
enum JoinedColumn {
    Backfill(usize),
    Admission(usize),
}

impl JoinedColumn {
    /// Prefer the backfill roster, fall back to the admission roster
    fn resolve(backfill: &Table, admission: &Table, name: &str) -> Result<Self> {
        if let Some(idx) = backfill.find_column(name) {
            return Ok(Self::Backfill(idx));
        }
        if let Some(idx) = admission.find_column(name) {
            return Ok(Self::Admission(idx));
        }
        Err(ReportError::MissingColumn {
            table: format!("{} / {}", backfill.name, admission.name),
            column: name.to_string(),
        })
    }

    fn get<'a>(
        self,
        backfill: &'a Table,
        backfill_row: &'a [CellValue],
        admission: &'a Table,
        admission_row: &'a [CellValue],
    ) -> &'a CellValue {
        match self {
            Self::Backfill(idx) => backfill.cell(backfill_row, idx),
            Self::Admission(idx) => admission.cell(admission_row, idx),
        }
    }
}

/// Hired backfill candidates of one posting, accumulated in encounter order.
/// Department and title hold the first non-empty value seen.
#[derive(Debug, Default)]
struct HiredGroup {
    department: CellValue,
    recruiting_title: CellValue,
    names: Vec<String>,
}

/// Execute Stage 2: Backfill admission matching
///
/// 1. Extracts the position code from each admission row's proposed position
/// 2. Inner-joins the backfill roster with the admission roster on
///    (authority, position code, name)
/// 3. Groups matches by posting, joining names in backfill-roster order
///
/// Postings without any match produce no row.
pub fn execute_stage2(backfill: &Table, admission: &Table) -> Result<Stage2Result> {
    let bf_authority = backfill.column(BACKFILL_AUTHORITY)?;
    let bf_code = backfill.column(POSITION_CODE)?;
    let bf_name = backfill.column(NAME)?;

    let ad_authority = admission.column(AUTHORITY)?;
    let ad_position = admission.column(PROPOSED_POSITION)?;
    let ad_name = admission.column(NAME)?;

    let department = JoinedColumn::resolve(backfill, admission, DEPARTMENT)?;
    let recruiting_title = JoinedColumn::resolve(backfill, admission, RECRUITING_TITLE)?;

    // (authority, code, name) -> admission row indices, in roster order
    let mut admitted: HashMap<(String, String, String), Vec<usize>> = HashMap::new();
    let mut admission_rows_without_code = 0;
    for (idx, row) in admission.rows.iter().enumerate() {
        let Some(code) = extract_position_code(&admission.cell(row, ad_position).display()) else {
            admission_rows_without_code += 1;
            continue;
        };
        admitted
            .entry((
                admission.cell(row, ad_authority).display(),
                code,
                admission.cell(row, ad_name).display(),
            ))
            .or_default()
            .push(idx);
    }

    if admission_rows_without_code > 0 {
        warn!(
            "Stage 2: {} admission rows have no trailing {}-digit position code and cannot match",
            admission_rows_without_code,
            POSITION_CODE_LEN
        );
    }

    let mut groups: BTreeMap<PostingKey, HiredGroup> = BTreeMap::new();
    let mut matched_candidates = 0;
    let mut backfill_rows_without_key = 0;

    for bf_row in &backfill.rows {
        let name = backfill.cell(bf_row, bf_name);
        let key = PostingKey::from_cells(
            backfill.cell(bf_row, bf_authority),
            backfill.cell(bf_row, bf_code),
        );
        let Some(key) = key.filter(|_| !name.is_empty()) else {
            backfill_rows_without_key += 1;
            continue;
        };
        let name = name.display();

        let Some(matches) = admitted.get(&(key.authority.clone(), key.code.clone(), name.clone()))
        else {
            continue;
        };

        let group = groups.entry(key).or_default();
        for &ad_idx in matches {
            let ad_row = &admission.rows[ad_idx];
            matched_candidates += 1;

            group
                .department
                .fill_from(department.get(backfill, bf_row, admission, ad_row));
            group
                .recruiting_title
                .fill_from(recruiting_title.get(backfill, bf_row, admission, ad_row));
            group.names.push(name.clone());
        }
    }

    if backfill_rows_without_key > 0 {
        warn!(
            "Stage 2: skipped {} backfill rows with a blank authority, position code or name",
            backfill_rows_without_key
        );
    }

    debug!(
        "Stage 2: {} matches across {} postings",
        matched_candidates,
        groups.len()
    );

    let rows: Vec<AdmissionRow> = groups
        .into_iter()
        .map(|(key, group)| {
            let hired_names = group.names.join(NAME_DELIMITER);
            AdmissionRow {
                key,
                department: group.department,
                recruiting_title: group.recruiting_title,
                hired_count: delimited_count(&hired_names),
                hired_names,
            }
        })
        .collect();

    info!(
        "Stage 2: {} postings with hired backfill candidates ({} candidates)",
        rows.len(),
        matched_candidates
    );

    Ok(Stage2Result {
        rows,
        admission_rows_without_code,
        backfill_rows_without_key,
        matched_candidates,
    })
}

/// Number of entries in a delimited name list (delimiters + 1)
fn delimited_count(names: &str) -> usize {
    names.matches(NAME_DELIMITER).count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHORITY_A: &str = "国家金融监督管理总局北京监管局";
    const CODE_A: &str = "300110001001";

    fn backfill_roster(rows: &[(&str, &str, &str)]) -> Table {
        let rows: Vec<_> = rows
            .iter()
            .map(|&(authority, code, name)| (authority, "办公室", "一级主任科员", code, name))
            .collect();
        backfill_roster_with_titles(&rows)
    }

    fn backfill_roster_with_titles(rows: &[(&str, &str, &str, &str, &str)]) -> Table {
        let mut table = Table::with_headers(
            "backfill roster",
            &[BACKFILL_AUTHORITY, DEPARTMENT, RECRUITING_TITLE, POSITION_CODE, NAME],
        );
        for (authority, department, title, code, name) in rows {
            table.push_row(vec![
                (*authority).into(),
                (*department).into(),
                (*title).into(),
                (*code).into(),
                (*name).into(),
            ]);
        }
        table
    }

    fn admission_roster(rows: &[(&str, &str, &str)]) -> Table {
        let mut table =
            Table::with_headers("admission roster", &[AUTHORITY, PROPOSED_POSITION, NAME]);
        for (authority, position, name) in rows {
            table.push_row(vec![(*authority).into(), (*position).into(), (*name).into()]);
        }
        table
    }

    #[test]
    fn test_matches_grouped_in_backfill_order() {
        let backfill = backfill_roster(&[
            (AUTHORITY_A, CODE_A, "李四"),
            (AUTHORITY_A, CODE_A, "张三"),
            (AUTHORITY_A, CODE_A, "王五"),
        ]);
        let admission = admission_roster(&[
            (AUTHORITY_A, "一级主任科员300110001001", "张三"),
            (AUTHORITY_A, "一级主任科员300110001001", "李四"),
            (AUTHORITY_A, "一级主任科员300110001001", "赵六"),
        ]);

        let result = execute_stage2(&backfill, &admission).unwrap();

        assert_eq!(result.rows.len(), 1);
        let row = &result.rows[0];
        assert_eq!(row.key, PostingKey::new(AUTHORITY_A, CODE_A));
        assert_eq!(row.hired_names, "李四、张三");
        assert_eq!(row.hired_count, 2);
        assert_eq!(row.department, CellValue::text("办公室"));
        assert_eq!(row.recruiting_title, CellValue::text("一级主任科员"));
        assert_eq!(result.matched_candidates, 2);
    }

    #[test]
    fn test_no_row_for_posting_without_matches() {
        let backfill = backfill_roster(&[
            (AUTHORITY_A, CODE_A, "张三"),
            (AUTHORITY_A, "300110001002", "李四"),
        ]);
        let admission = admission_roster(&[(AUTHORITY_A, "科员300110001001", "张三")]);

        let result = execute_stage2(&backfill, &admission).unwrap();

        assert_eq!(result.rows.len(), 1);
        assert!(result.rows.iter().all(|r| r.key.code != "300110001002"));
        assert!(result.rows.iter().all(|r| r.hired_count > 0));
    }

    #[test]
    fn test_join_requires_authority_code_and_name() {
        let backfill = backfill_roster(&[(AUTHORITY_A, CODE_A, "张三")]);
        let admission = admission_roster(&[
            ("海关总署", "科员300110001001", "张三"),
            (AUTHORITY_A, "科员300110001002", "张三"),
            (AUTHORITY_A, "科员300110001001", "张三丰"),
        ]);

        let result = execute_stage2(&backfill, &admission).unwrap();
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_admission_rows_without_code_are_skipped() {
        let backfill = backfill_roster(&[(AUTHORITY_A, CODE_A, "张三")]);
        let admission = admission_roster(&[
            (AUTHORITY_A, "科员", "张三"),
            (AUTHORITY_A, "科员30011000100", "张三"),
            // Longer digit tail: its last 12 digits are a different code
            (AUTHORITY_A, "科员3001100010011", "张三"),
        ]);

        let result = execute_stage2(&backfill, &admission).unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.admission_rows_without_code, 2);
    }

    #[test]
    fn test_longer_digit_tail_matches_on_last_twelve_digits() {
        let backfill = backfill_roster(&[(AUTHORITY_A, CODE_A, "张三")]);
        let admission = admission_roster(&[(AUTHORITY_A, "科员2300110001001", "张三")]);

        let result = execute_stage2(&backfill, &admission).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].key, PostingKey::new(AUTHORITY_A, CODE_A));
    }

    #[test]
    fn test_backfill_rows_with_blank_key_are_skipped() {
        let backfill = backfill_roster(&[
            ("", CODE_A, "张三"),
            (AUTHORITY_A, "", "张三"),
            (AUTHORITY_A, CODE_A, ""),
            (AUTHORITY_A, CODE_A, "李四"),
        ]);
        let admission = admission_roster(&[
            (AUTHORITY_A, "科员300110001001", "李四"),
            (AUTHORITY_A, "科员300110001001", ""),
        ]);

        let result = execute_stage2(&backfill, &admission).unwrap();
        assert_eq!(result.backfill_rows_without_key, 3);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].hired_names, "李四");
        assert_eq!(result.matched_candidates, 1);
    }

    #[test]
    fn test_descriptive_columns_take_first_non_empty_value() {
        let backfill = backfill_roster_with_titles(&[
            (AUTHORITY_A, "", "", CODE_A, "张三"),
            (AUTHORITY_A, "综合处", "一级科员", CODE_A, "李四"),
            (AUTHORITY_A, "办公室", "二级科员", CODE_A, "王五"),
        ]);
        let admission = admission_roster(&[
            (AUTHORITY_A, "科员300110001001", "张三"),
            (AUTHORITY_A, "科员300110001001", "李四"),
            (AUTHORITY_A, "科员300110001001", "王五"),
        ]);

        let result = execute_stage2(&backfill, &admission).unwrap();
        let row = &result.rows[0];
        assert_eq!(row.department, CellValue::text("综合处"));
        assert_eq!(row.recruiting_title, CellValue::text("一级科员"));
        assert_eq!(row.hired_count, 3);
    }

    #[test]
    fn test_descriptive_columns_fall_back_to_admission_roster() {
        let mut backfill =
            Table::with_headers("backfill roster", &[BACKFILL_AUTHORITY, POSITION_CODE, NAME]);
        backfill.push_row(vec![AUTHORITY_A.into(), CODE_A.into(), "张三".into()]);
        let mut admission = Table::with_headers(
            "admission roster",
            &[AUTHORITY, DEPARTMENT, RECRUITING_TITLE, PROPOSED_POSITION, NAME],
        );
        admission.push_row(vec![
            AUTHORITY_A.into(),
            "综合处".into(),
            "科员".into(),
            "科员300110001001".into(),
            "张三".into(),
        ]);

        let result = execute_stage2(&backfill, &admission).unwrap();
        assert_eq!(result.rows[0].department, CellValue::text("综合处"));
        assert_eq!(result.rows[0].recruiting_title, CellValue::text("科员"));
    }

    #[test]
    fn test_missing_descriptive_column_is_an_error() {
        let backfill =
            Table::with_headers("backfill roster", &[BACKFILL_AUTHORITY, POSITION_CODE, NAME]);
        let admission =
            Table::with_headers("admission roster", &[AUTHORITY, PROPOSED_POSITION, NAME]);
        let err = execute_stage2(&backfill, &admission).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn { ref column, .. } if column == DEPARTMENT));
    }

    #[test]
    fn test_delimited_count() {
        assert_eq!(delimited_count("张三"), 1);
        assert_eq!(delimited_count("张三、李四、王五"), 3);
    }
}
