//! Lookup tables behind persona, job and category detection.
//!
//! A `KnowledgeBase` is built once per process (`builtin()` or loaded from
//! JSON), validated, and then shared read-only.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::section::Category;

/// Name of the tier every built-in persona uses for role-identity terms.
pub const PRIMARY_TIER: &str = "primary";

/// Tolerance on a job type's priority weight sum.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// A named, weighted group of keywords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusTier {
    pub name: String,
    pub weight: f64,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaEntry {
    pub name: String,
    pub tiers: Vec<FocusTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEntry {
    pub name: String,
    pub patterns: Vec<String>,
    pub priority_weights: BTreeMap<String, f64>,
}

/// Keyword detector for one category, plus the focus tiers that category
/// serves (used for the section-type bonus).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: Vec<String>,
    pub related_tiers: Vec<String>,
}

/// Vocabulary for the content-quality indicators. Numeric data is detected
/// structurally and needs no list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIndicators {
    pub comparative: Vec<String>,
    pub examples: Vec<String>,
    pub methodology: Vec<String>,
    pub high_value: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub personas: Vec<PersonaEntry>,
    pub jobs: Vec<JobEntry>,
    pub categories: Vec<CategoryRule>,
    pub indicators: QualityIndicators,
}

impl KnowledgeBase {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let kb: KnowledgeBase = serde_json::from_str(json)?;
        kb.validate()?;
        Ok(kb)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Every tier name declared by any persona, sorted.
    pub fn tier_universe(&self) -> BTreeSet<String> {
        self.personas
            .iter()
            .flat_map(|p| p.tiers.iter().map(|t| t.name.clone()))
            .collect()
    }

    /// Checks the structural rules the analyzers and scorer rely on.
    pub fn validate(&self) -> Result<()> {
        if self.personas.is_empty() {
            return Err(invalid("no personas declared"));
        }

        let mut persona_names = HashSet::new();
        for persona in &self.personas {
            let name = persona.name.trim();
            if name.is_empty() {
                return Err(invalid("persona with an empty name"));
            }
            if name == "unknown" {
                return Err(invalid("persona name 'unknown' is reserved"));
            }
            if !persona_names.insert(name) {
                return Err(invalid(format!("duplicate persona '{name}'")));
            }
            if persona.tiers.is_empty() {
                return Err(invalid(format!("persona '{name}' has no tiers")));
            }
            let mut tier_names = HashSet::new();
            for tier in &persona.tiers {
                if !tier_names.insert(tier.name.as_str()) {
                    return Err(invalid(format!(
                        "persona '{name}' declares tier '{}' twice",
                        tier.name
                    )));
                }
                if !(tier.weight > 0.0 && tier.weight <= 1.0) {
                    return Err(invalid(format!(
                        "tier '{name}.{}' weight {} outside (0, 1]",
                        tier.name, tier.weight
                    )));
                }
                if tier.keywords.iter().all(|k| k.trim().is_empty()) {
                    return Err(invalid(format!(
                        "tier '{name}.{}' has no keywords",
                        tier.name
                    )));
                }
            }
        }

        let universe = self.tier_universe();

        let mut job_names = HashSet::new();
        for job in &self.jobs {
            let name = job.name.trim();
            if name.is_empty() {
                return Err(invalid("job type with an empty name"));
            }
            if name == "general" {
                return Err(invalid("job type name 'general' is reserved"));
            }
            if !job_names.insert(name) {
                return Err(invalid(format!("duplicate job type '{name}'")));
            }
            if job.patterns.iter().all(|p| p.trim().is_empty()) {
                return Err(invalid(format!("job type '{name}' has no patterns")));
            }
            let mut sum = 0.0;
            for (tier, weight) in &job.priority_weights {
                if !universe.contains(tier) {
                    return Err(invalid(format!(
                        "job type '{name}' weights unknown tier '{tier}'"
                    )));
                }
                if !(0.0..=1.0).contains(weight) {
                    return Err(invalid(format!(
                        "job type '{name}' weight for '{tier}' outside [0, 1]"
                    )));
                }
                sum += weight;
            }
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(invalid(format!(
                    "job type '{name}' priority weights sum to {sum}, expected 1.0"
                )));
            }
        }

        let mut previous: Option<Category> = None;
        for rule in &self.categories {
            if rule.category == Category::Other {
                return Err(invalid("'other' is the fallback category and takes no rule"));
            }
            if let Some(prev) = previous {
                if rule.category <= prev {
                    return Err(invalid(format!(
                        "category rule '{}' is out of priority order",
                        rule.category
                    )));
                }
            }
            previous = Some(rule.category);
            if let Some(tier) = rule.related_tiers.iter().find(|t| !universe.contains(*t)) {
                return Err(invalid(format!(
                    "category '{}' relates to unknown tier '{tier}'",
                    rule.category
                )));
            }
        }

        Ok(())
    }

    /// The tables shipped with the binary.
    pub fn builtin() -> Self {
        Self {
            personas: builtin_personas(),
            jobs: builtin_jobs(),
            categories: builtin_categories(),
            indicators: QualityIndicators {
                comparative: words(&[
                    "compared", "comparison", "versus", "vs", "than", "relative to",
                    "outperform", "better", "higher", "lower",
                ]),
                examples: words(&[
                    "for example", "e.g.", "such as", "for instance", "case study",
                    "illustration",
                ]),
                methodology: words(&[
                    "method", "approach", "technique", "procedure", "process", "protocol",
                ]),
                high_value: words(&[
                    "important", "significant", "critical", "essential", "key", "major",
                    "recommend", "must", "conclusion", "insight",
                ]),
            },
        }
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidKnowledge(msg.into())
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn tier(name: &str, weight: f64, keywords: &[&str]) -> FocusTier {
    FocusTier {
        name: name.to_string(),
        weight,
        keywords: words(keywords),
    }
}

fn persona(name: &str, tiers: Vec<FocusTier>) -> PersonaEntry {
    PersonaEntry {
        name: name.to_string(),
        tiers,
    }
}

fn job(name: &str, patterns: &[&str], weights: &[(&str, f64)]) -> JobEntry {
    JobEntry {
        name: name.to_string(),
        patterns: words(patterns),
        priority_weights: weights.iter().map(|(t, w)| (t.to_string(), *w)).collect(),
    }
}

fn builtin_personas() -> Vec<PersonaEntry> {
    vec![
        persona(
            "researcher",
            vec![
                tier(PRIMARY_TIER, 1.0, &[
                    "researcher", "phd", "scientist", "academic", "scholar", "professor", "postdoc",
                ]),
                tier("methodology", 0.9, &[
                    "methodology", "methods", "approach", "experimental", "procedure", "protocol",
                    "algorithm", "technique", "framework",
                ]),
                tier("datasets", 0.7, &[
                    "dataset", "data", "training", "validation", "test set", "corpus",
                    "ground truth",
                ]),
                tier("benchmarks", 0.8, &[
                    "benchmark", "evaluation", "performance", "metrics", "accuracy", "precision",
                    "recall", "f1-score", "baseline", "comparison",
                ]),
                tier("results", 0.8, &[
                    "results", "findings", "outcomes", "conclusions", "discussion",
                    "observations", "insights", "evidence",
                ]),
                tier("literature", 0.6, &[
                    "related work", "previous work", "state of the art", "literature review",
                    "existing approaches", "citations",
                ]),
                tier("gaps", 0.6, &[
                    "limitation", "gap", "future work", "open problem", "research direction",
                ]),
            ],
        ),
        persona(
            "student",
            vec![
                tier(PRIMARY_TIER, 1.0, &["student", "undergraduate", "learner", "pupil"]),
                tier("concepts", 0.9, &[
                    "concept", "definition", "principle", "theory", "fundamental", "core idea",
                    "key concept",
                ]),
                tier("mechanisms", 0.8, &[
                    "mechanism", "process", "reaction", "pathway", "interaction", "step-by-step",
                    "how it works",
                ]),
                tier("examples", 0.7, &[
                    "example", "case study", "illustration", "demonstration", "instance",
                    "scenario",
                ]),
                tier("key_points", 0.8, &[
                    "key point", "important", "critical", "essential", "main point", "takeaway",
                    "summary",
                ]),
                tier("practice", 0.6, &[
                    "exercise", "problem", "question", "practice", "homework", "assignment",
                    "quiz",
                ]),
            ],
        ),
        persona(
            "analyst",
            vec![
                tier(PRIMARY_TIER, 1.0, &["analyst", "economist", "auditor", "consultant"]),
                tier("trends", 0.9, &[
                    "trend", "growth", "decline", "increase", "decrease", "pattern", "forecast",
                ]),
                tier("financials", 0.9, &[
                    "revenue", "profit", "loss", "earnings", "financial", "fiscal", "income",
                    "expense",
                ]),
                tier("strategy", 0.7, &[
                    "strategy", "positioning", "market", "competitive", "business plan", "tactic",
                ]),
                tier("investments", 0.7, &[
                    "investment", "capital", "funding", "expenditure", "allocation", "r&d",
                ]),
                tier("performance", 0.8, &[
                    "performance", "metrics", "kpi", "indicators", "efficiency", "productivity",
                ]),
            ],
        ),
        persona(
            "journalist",
            vec![
                tier(PRIMARY_TIER, 1.0, &[
                    "journalist", "reporter", "correspondent", "editor", "press",
                ]),
                tier("news", 0.9, &[
                    "announcement", "news", "update", "release", "statement", "breaking",
                    "latest",
                ]),
                tier("facts", 0.9, &[
                    "fact", "statistics", "figure", "evidence", "proof", "verification",
                ]),
                tier("quotes", 0.6, &[
                    "quote", "comment", "said", "according to", "interview", "spokesperson",
                ]),
                tier("context", 0.7, &[
                    "background", "context", "history", "timeline", "overview", "setting",
                ]),
                tier("impact", 0.8, &[
                    "impact", "effect", "consequence", "implication", "significance", "influence",
                ]),
            ],
        ),
        persona(
            "entrepreneur",
            vec![
                tier(PRIMARY_TIER, 1.0, &[
                    "entrepreneur", "founder", "startup", "business owner", "ceo",
                ]),
                tier("opportunity", 0.9, &[
                    "opportunity", "demand", "potential", "market gap", "niche", "prospect",
                ]),
                tier("strategy", 0.8, &[
                    "strategy", "business model", "roadmap", "blueprint", "go-to-market",
                ]),
                tier("resources", 0.7, &[
                    "resource", "funding", "investor", "capital", "asset", "infrastructure",
                ]),
                tier("risks", 0.8, &[
                    "risk", "challenge", "threat", "obstacle", "barrier", "vulnerability",
                ]),
                tier("execution", 0.7, &[
                    "execution", "implementation", "timeline", "milestone", "deliverable",
                    "rollout",
                ]),
            ],
        ),
        persona(
            "travel_planner",
            vec![
                tier(PRIMARY_TIER, 1.0, &[
                    "travel planner", "travel", "planner", "tourist", "tour operator",
                ]),
                tier("destinations", 0.9, &[
                    "city", "destination", "location", "region", "town", "village", "coast",
                    "beach",
                ]),
                tier("activities", 0.9, &[
                    "activity", "attraction", "sightseeing", "tour", "excursion", "explore",
                    "experience", "nightlife",
                ]),
                tier("accommodation", 0.8, &[
                    "hotel", "accommodation", "lodging", "stay", "hostel", "resort", "restaurant",
                    "dining",
                ]),
                tier("planning", 0.8, &[
                    "itinerary", "schedule", "trip", "booking", "reservation", "transport",
                    "budget", "group",
                ]),
                tier("tips", 0.6, &[
                    "tip", "advice", "recommendation", "suggestion", "packing", "guide",
                ]),
                tier("culture", 0.6, &[
                    "culture", "tradition", "history", "heritage", "custom", "cuisine", "local",
                ]),
            ],
        ),
        persona(
            "hr_professional",
            vec![
                tier(PRIMARY_TIER, 1.0, &[
                    "hr professional", "hr", "human resources", "recruiter", "hiring manager",
                ]),
                tier("forms", 0.9, &[
                    "form", "fillable", "field", "text box", "checkbox", "dropdown", "pdf",
                ]),
                tier("signatures", 0.8, &[
                    "signature", "sign", "e-signature", "electronic", "approval",
                ]),
                tier("compliance", 0.8, &[
                    "compliance", "required", "policy", "regulation", "contract", "tax form",
                ]),
                tier("onboarding", 0.9, &[
                    "onboarding", "employee", "new hire", "paperwork", "orientation",
                ]),
            ],
        ),
        persona(
            "food_contractor",
            vec![
                tier(PRIMARY_TIER, 1.0, &[
                    "food contractor", "caterer", "catering", "chef", "cook",
                ]),
                tier("menu", 0.9, &[
                    "menu", "buffet", "dish", "course", "appetizer", "main course", "dessert",
                    "salad", "soup", "dinner",
                ]),
                tier("dietary", 0.9, &[
                    "vegetarian", "vegan", "gluten-free", "allergy", "dietary", "dairy-free",
                ]),
                tier("ingredients", 0.8, &[
                    "ingredient", "recipe", "spice", "garlic", "vegetable", "sauce",
                ]),
                tier("preparation", 0.7, &[
                    "preparation", "cooking", "serving", "bake", "roast", "grill",
                ]),
            ],
        ),
    ]
}

fn builtin_jobs() -> Vec<JobEntry> {
    vec![
        job(
            "literature_review",
            &[
                "literature review", "state of the art", "related work", "comprehensive review",
                "survey", "review",
            ],
            &[
                ("methodology", 0.25),
                ("datasets", 0.20),
                ("benchmarks", 0.25),
                ("results", 0.20),
                ("gaps", 0.10),
            ],
        ),
        job(
            "exam_preparation",
            &[
                "exam preparation", "prepare for", "study guide", "key concepts", "test prep",
                "exam", "revision",
            ],
            &[
                ("concepts", 0.30),
                ("mechanisms", 0.25),
                ("key_points", 0.25),
                ("examples", 0.20),
            ],
        ),
        job(
            "financial_analysis",
            &[
                "financial analysis", "analyze revenue", "revenue trends", "financial",
                "earnings", "revenue", "investment",
            ],
            &[
                ("trends", 0.25),
                ("financials", 0.30),
                ("strategy", 0.20),
                ("investments", 0.15),
                ("performance", 0.10),
            ],
        ),
        job(
            "market_research",
            &[
                "market research", "competitive analysis", "competition", "industry", "market",
            ],
            &[
                ("trends", 0.20),
                ("strategy", 0.25),
                ("opportunity", 0.25),
                ("risks", 0.15),
                ("context", 0.15),
            ],
        ),
        job(
            "news_coverage",
            &[
                "write an article", "news story", "breaking news", "report on", "coverage",
                "article",
            ],
            &[
                ("news", 0.30),
                ("facts", 0.30),
                ("quotes", 0.15),
                ("context", 0.10),
                ("impact", 0.15),
            ],
        ),
        job(
            "travel_planning",
            &[
                "plan a trip", "plan a vacation", "itinerary", "trip", "vacation", "travel",
                "holiday", "tour", "visit",
            ],
            &[
                ("destinations", 0.25),
                ("activities", 0.25),
                ("accommodation", 0.20),
                ("planning", 0.15),
                ("tips", 0.10),
                ("culture", 0.05),
            ],
        ),
        job(
            "hr_forms",
            &[
                "create and manage fillable forms", "fillable forms", "onboarding",
                "compliance", "forms",
            ],
            &[
                ("forms", 0.35),
                ("onboarding", 0.25),
                ("compliance", 0.25),
                ("signatures", 0.15),
            ],
        ),
        job(
            "menu_planning",
            &[
                "prepare a vegetarian buffet", "buffet", "menu", "dinner", "catering",
                "gluten-free",
            ],
            &[
                ("menu", 0.30),
                ("dietary", 0.30),
                ("ingredients", 0.20),
                ("preparation", 0.20),
            ],
        ),
    ]
}

fn builtin_categories() -> Vec<CategoryRule> {
    fn rule(category: Category, keywords: &[&str], related: &[&str]) -> CategoryRule {
        CategoryRule {
            category,
            keywords: words(keywords),
            related_tiers: words(related),
        }
    }

    vec![
        rule(
            Category::Methodology,
            &[
                "methodology", "method", "approach", "procedure", "protocol", "technique",
                "experiment", "framework", "algorithm",
            ],
            &["methodology", "mechanisms", "preparation", "execution", "strategy"],
        ),
        rule(
            Category::Results,
            &[
                "results", "findings", "outcome", "conclusion", "accuracy", "performance",
                "evidence", "revenue", "impact",
            ],
            &["results", "benchmarks", "performance", "financials", "facts", "impact", "trends"],
        ),
        rule(
            Category::Background,
            &[
                "introduction", "overview", "background", "history", "context", "literature",
                "related work", "tradition", "heritage", "culture",
            ],
            &["literature", "context", "concepts", "culture"],
        ),
        rule(
            Category::Logistics,
            &[
                "itinerary", "schedule", "booking", "reservation", "transport", "hotel",
                "accommodation", "restaurant", "flight", "train", "budget", "cost", "price",
                "packing", "form", "deadline", "menu",
            ],
            &[
                "planning", "accommodation", "tips", "destinations", "activities", "forms",
                "onboarding", "compliance", "signatures", "menu", "dietary", "ingredients",
            ],
        ),
    ]
}
