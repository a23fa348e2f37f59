// src/services/company.rs

//! Company-specific tests: the same snapshot, sanitize and grade steps as
//! regular attempts, but nothing is persisted between `start` and `submit`.
//!
//! `submit` re-reads the bank, so an answer key edited after `start` is graded
//! with its current value. Regular attempts grade against their stored
//! snapshot instead; this path deliberately does not.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use sqlx::{SqlitePool, types::Json};

use crate::{
    error::AppError,
    models::{
        company_test::{
            CompanyResponse, CompanyStartResponse, CompanySubmitRequest, CompanySubmitResult,
            CompanyTest, CompanyTestSummary, NOT_AUTO_GRADED, ResponseDetail, SanitizedSection,
            Section, SectionKind, UpsertCompanyTestRequest,
        },
        question::{BankEntry, QuestionSnapshot, build_snapshot},
    },
    services::{
        bank::{QuestionBank, missing_ids},
        grading,
    },
    utils::html::clean_html,
};

const COMPANY_TEST_COLUMNS: &str = "company_slug, test_id, title, duration_sec, sections, updated_at";

#[derive(Clone)]
pub struct CompanyTests {
    pool: SqlitePool,
    bank: Arc<dyn QuestionBank>,
}

impl CompanyTests {
    pub fn new(pool: SqlitePool, bank: Arc<dyn QuestionBank>) -> Self {
        Self { pool, bank }
    }

    pub async fn upsert(&self, req: UpsertCompanyTestRequest) -> Result<CompanyTest, AppError> {
        let ids: Vec<String> = req
            .sections
            .iter()
            .flat_map(|s| s.question_ids.iter().cloned())
            .collect();
        let missing = missing_ids(self.bank.as_ref(), &ids).await?;
        if !missing.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Unknown question ids: {}",
                missing.join(", ")
            )));
        }

        let test = sqlx::query_as::<_, CompanyTest>(&format!(
            r#"
            INSERT INTO company_tests ({COMPANY_TEST_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (company_slug, test_id) DO UPDATE SET
                title = excluded.title,
                duration_sec = excluded.duration_sec,
                sections = excluded.sections,
                updated_at = excluded.updated_at
            RETURNING {COMPANY_TEST_COLUMNS}
            "#
        ))
        .bind(&req.company_slug)
        .bind(&req.test_id)
        .bind(clean_html(&req.title))
        .bind(req.duration_sec)
        .bind(Json(&req.sections))
        .bind(chrono::Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(company = %test.company_slug, test_id = %test.test_id, "company test saved");
        Ok(test)
    }

    pub async fn list(&self, company_slug: &str) -> Result<Vec<CompanyTestSummary>, AppError> {
        let tests = sqlx::query_as::<_, CompanyTest>(&format!(
            "SELECT {COMPANY_TEST_COLUMNS} FROM company_tests WHERE company_slug = $1 ORDER BY test_id"
        ))
        .bind(company_slug)
        .fetch_all(&self.pool)
        .await?;
        Ok(tests.iter().map(CompanyTestSummary::from).collect())
    }

    pub async fn get(&self, company_slug: &str, test_id: &str) -> Result<CompanyTest, AppError> {
        sqlx::query_as::<_, CompanyTest>(&format!(
            "SELECT {COMPANY_TEST_COLUMNS} FROM company_tests WHERE company_slug = $1 AND test_id = $2"
        ))
        .bind(company_slug)
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Company test '{}/{}' not found", company_slug, test_id))
        })
    }

    /// Sanitized questions for every section. Nothing is stored.
    pub async fn start(&self, company_slug: &str, test_id: &str) -> Result<CompanyStartResponse, AppError> {
        let test = self.get(company_slug, test_id).await?;
        let ids: Vec<String> = test
            .sections
            .iter()
            .flat_map(|s| s.question_ids.iter().cloned())
            .collect();
        let entries = self.bank.fetch_many(&ids).await?;

        let sections = test
            .sections
            .iter()
            .map(|section| SanitizedSection {
                key: section.key,
                title: section.title.clone(),
                points_per_question: section.points_per_question,
                questions: build_snapshot(&section.question_ids, entries.clone())
                    .into_iter()
                    .map(|mut q| {
                        q.points = section.points_per_question;
                        q.sanitized()
                    })
                    .collect(),
            })
            .collect();

        Ok(CompanyStartResponse {
            test_id: test.test_id,
            title: test.title,
            duration_sec: test.duration_sec,
            sections,
        })
    }

    /// Grades `mcq` responses against the bank as it is now; `coding` and
    /// `essay` responses are echoed back ungraded.
    pub async fn submit(
        &self,
        company_slug: &str,
        test_id: &str,
        req: CompanySubmitRequest,
    ) -> Result<CompanySubmitResult, AppError> {
        let test = self.get(company_slug, test_id).await?;

        let known: HashSet<&str> = test.sections.iter().map(|s| s.key.as_str()).collect();
        for key in req.responses.keys().filter(|k| !known.contains(k.as_str())) {
            tracing::debug!(%key, test_id, "ignoring responses for unknown section");
        }

        let mcq_ids: Vec<String> = test
            .sections
            .iter()
            .filter(|s| s.key == SectionKind::Mcq)
            .flat_map(|s| s.question_ids.iter().cloned())
            .collect();
        let bank: HashMap<String, BankEntry> = self
            .bank
            .fetch_many(&mcq_ids)
            .await?
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect();

        let mut result = CompanySubmitResult {
            score: 0.0,
            total: 0.0,
            details: BTreeMap::new(),
        };

        for section in test.sections.iter() {
            let responses = req
                .responses
                .get(section.key.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();

            let details = match section.key {
                SectionKind::Mcq => {
                    let delivered = section
                        .question_ids
                        .iter()
                        .filter(|id| bank.contains_key(*id))
                        .count();
                    result.total += section.points_per_question * delivered as f64;
                    grade_mcq_section(section, responses, &bank)
                }
                SectionKind::Coding | SectionKind::Essay => responses
                    .iter()
                    .map(|r| ResponseDetail {
                        bank_id: r.bank_id.clone(),
                        value: r.value.clone(),
                        correct: None,
                        points_awarded: 0.0,
                        note: Some(NOT_AUTO_GRADED.to_string()),
                    })
                    .collect(),
            };

            result.score += details.iter().map(|d| d.points_awarded).sum::<f64>();
            result.details.insert(section.key.as_str().to_string(), details);
        }

        tracing::info!(
            company = company_slug,
            test_id,
            score = result.score,
            total = result.total,
            "company test graded"
        );
        Ok(result)
    }
}

fn grade_mcq_section(
    section: &Section,
    responses: &[CompanyResponse],
    bank: &HashMap<String, BankEntry>,
) -> Vec<ResponseDetail> {
    let mut seen = HashSet::new();

    responses
        .iter()
        .map(|response| {
            let question = section
                .question_ids
                .contains(&response.bank_id)
                .then(|| bank.get(&response.bank_id))
                .flatten()
                .filter(|_| seen.insert(response.bank_id.clone()))
                .map(|entry| QuestionSnapshot {
                    points: section.points_per_question,
                    ..QuestionSnapshot::from_bank(0, entry.clone())
                });

            let (correct, points_awarded) =
                grading::grade_one(question.as_ref(), response.value.as_ref());

            ResponseDetail {
                bank_id: response.bank_id.clone(),
                value: response.value.clone(),
                correct,
                points_awarded,
                note: question.is_none().then(|| "unknown or repeated question".to_string()),
            }
        })
        .collect()
}
