use serde::{Deserialize, Serialize};
use synthdb_core::{
    GenerationHints, ParsedSchema, SchemaInfo, Table, analyze_table_schema,
    get_data_generation_hints, table_metadata,
};
use tracing::info;

use crate::resolver::Resolution;

/// Rank given to tables the resolver did not order.
pub const UNRANKED: usize = 999;

/// Everything the batch generator needs to produce one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableGenerationPlan {
    pub table_name: String,
    /// Position in the generation order, 0 for the first table.
    pub generation_order: usize,
    pub dependencies: Vec<String>,
    pub target_records: usize,
    pub domain_context: String,
    pub schema_info: SchemaInfo,
    pub generation_hints: GenerationHints,
}

impl TableGenerationPlan {
    /// Plan skeleton for a table; order and dependencies are filled in later.
    pub fn new(table: &Table, business_context: &str, target_records: usize) -> Self {
        let schema_info = analyze_table_schema(&table_metadata(table));
        let generation_hints = get_data_generation_hints(&schema_info);
        Self {
            table_name: table.name.clone(),
            generation_order: 0,
            dependencies: Vec::new(),
            target_records,
            domain_context: domain_context(table, business_context),
            schema_info,
            generation_hints,
        }
    }

    /// Rows needed to count as generated under `threshold`.
    pub fn required_records(&self, threshold: f64) -> f64 {
        self.target_records as f64 * threshold
    }

    pub fn meets_threshold(&self, generated: usize, threshold: f64) -> bool {
        generated > 0 && generated as f64 >= self.required_records(threshold)
    }
}

struct DomainVocabulary {
    keywords: &'static [&'static str],
    label: &'static str,
    focus: &'static str,
}

const DOMAINS: &[DomainVocabulary] = &[
    DomainVocabulary {
        keywords: &["patient", "doctor", "medical", "treatment", "diagnosis"],
        label: "Healthcare",
        focus: "medical records, patient care, clinical operations",
    },
    DomainVocabulary {
        keywords: &["product", "inventory", "order", "customer", "purchase"],
        label: "E-commerce/Retail",
        focus: "products, customers, transactions, inventory",
    },
    DomainVocabulary {
        keywords: &["account", "transaction", "payment", "finance", "balance"],
        label: "Financial",
        focus: "accounts, transactions, financial records",
    },
    DomainVocabulary {
        keywords: &["student", "course", "teacher", "class", "grade"],
        label: "Educational",
        focus: "students, courses, academic records",
    },
];

/// Short domain hint for a table.
///
/// The table name is matched against each vocabulary first, in priority
/// order; column names are only consulted when the table name matches none.
pub fn domain_context(table: &Table, business_context: &str) -> String {
    let table_name = table.name.to_lowercase();
    let columns: Vec<String> = table.columns.iter().map(|c| c.name.to_lowercase()).collect();

    let matched = DOMAINS
        .iter()
        .find(|domain| domain.keywords.iter().any(|kw| table_name.contains(kw)))
        .or_else(|| {
            DOMAINS.iter().find(|domain| {
                domain
                    .keywords
                    .iter()
                    .any(|kw| columns.iter().any(|column| column.contains(kw)))
            })
        });

    match matched {
        Some(domain) => format!(
            "{} data for {business_context} - {}",
            domain.label, domain.focus
        ),
        None => format!(
            "Business data for {business_context} - operational records and business processes"
        ),
    }
}

/// One plan skeleton per table, in schema order.
pub fn build_plans(
    schema: &ParsedSchema,
    business_context: &str,
    target_records: usize,
) -> Vec<TableGenerationPlan> {
    let plans: Vec<TableGenerationPlan> = schema
        .tables
        .iter()
        .map(|table| TableGenerationPlan::new(table, business_context, target_records))
        .collect();
    info!(tables = plans.len(), "created generation plans");
    plans
}

/// Annotate plans with rank and dependencies, then sort them by rank.
///
/// The sort is stable, so unranked tables keep their relative order.
pub fn apply_resolution(plans: &mut [TableGenerationPlan], resolution: &Resolution) {
    for plan in plans.iter_mut() {
        plan.generation_order = resolution.rank_of(&plan.table_name).unwrap_or(UNRANKED);
        plan.dependencies = resolution.dependencies_of(&plan.table_name).to_vec();
    }
    plans.sort_by_key(|plan| plan.generation_order);
}
