//! Curated package sets used for categorization and scoring

pub const WEB_FRAMEWORKS: &[&str] = &[
    "aiohttp",
    "django",
    "fastapi",
    "flask",
    "sanic",
    "starlette",
    "tornado",
];

pub const WEB_RUNTIME: &[&str] = &["granian", "gunicorn", "hypercorn", "uvicorn"];

pub const WEB_RELATED: &[&str] = &[
    "alembic",
    "asyncpg",
    "celery",
    "httpx",
    "jinja2",
    "psycopg2",
    "pydantic",
    "redis",
    "requests",
    "sqlalchemy",
];

pub const ML_CORE: &[&str] = &[
    "catboost",
    "datasets",
    "flax",
    "jax",
    "keras",
    "lightgbm",
    "opencv-python",
    "scikit-learn",
    "sklearn",
    "spacy",
    "tensorflow",
    "torch",
    "transformers",
    "xgboost",
];

/// Deep-learning frameworks; any one of them earns the ML bonus
pub const ML_FRAMEWORKS: &[&str] = &["jax", "tensorflow", "torch"];

pub const SCIENTIFIC_CORE: &[&str] = &[
    "astropy",
    "bokeh",
    "ipykernel",
    "jupyter",
    "matplotlib",
    "notebook",
    "numpy",
    "pandas",
    "plotly",
    "scipy",
    "seaborn",
    "statsmodels",
    "sympy",
];

/// Array/numeric foundations; any one of them earns the scientific bonus
pub const SCIENTIFIC_FOUNDATIONS: &[&str] = &["numpy", "scipy"];

pub const CLI_CORE: &[&str] = &["click", "docopt", "prompt-toolkit", "rich", "textual", "typer"];

pub const DEV_TOOLS: &[&str] = &[
    "black",
    "coverage",
    "flake8",
    "hypothesis",
    "isort",
    "mypy",
    "pre-commit",
    "pytest",
    "ruff",
    "tox",
];

/// Report category of a normalized package name
pub fn category_for(package: &str) -> &'static str {
    let rules: [(&[&str], &'static str); 7] = [
        (DEV_TOOLS, "dev"),
        (CLI_CORE, "cli"),
        (SCIENTIFIC_CORE, "scientific"),
        (ML_CORE, "ml"),
        (WEB_RELATED, "web"),
        (WEB_RUNTIME, "runtime:web"),
        (WEB_FRAMEWORKS, "framework:web"),
    ];
    rules
        .iter()
        .find(|(set, _)| set.contains(&package))
        .map(|(_, category)| *category)
        .unwrap_or("library")
}

/// Sorted members of `set` present in `packages`
pub fn hits<'a, I>(packages: I, set: &[&str]) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut found: Vec<String> = packages
        .into_iter()
        .filter(|p| set.contains(&p.as_str()))
        .cloned()
        .collect();
    found.sort();
    found.dedup();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(category_for("fastapi"), "framework:web");
        assert_eq!(category_for("uvicorn"), "runtime:web");
        assert_eq!(category_for("pydantic"), "web");
        assert_eq!(category_for("torch"), "ml");
        assert_eq!(category_for("numpy"), "scientific");
        assert_eq!(category_for("typer"), "cli");
        assert_eq!(category_for("pytest"), "dev");
        assert_eq!(category_for("attrs"), "library");
    }

    #[test]
    fn test_sets_are_disjoint() {
        let sets = [
            WEB_FRAMEWORKS,
            WEB_RUNTIME,
            WEB_RELATED,
            ML_CORE,
            SCIENTIFIC_CORE,
            CLI_CORE,
            DEV_TOOLS,
        ];
        for (i, a) in sets.iter().enumerate() {
            for b in sets.iter().skip(i + 1) {
                assert!(a.iter().all(|p| !b.contains(p)), "overlap involving {:?}", a);
            }
        }
    }

    #[test]
    fn test_hits_sorted() {
        let packages = vec!["torch".to_string(), "jax".to_string(), "attrs".to_string()];
        assert_eq!(hits(&packages, ML_FRAMEWORKS), vec!["jax", "torch"]);
    }
}
