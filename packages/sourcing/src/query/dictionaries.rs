//! Static matching dictionaries for the query enhancer.
//!
//! Each skill entry expands a matched term into its associated cluster, so
//! "react" also pulls in the surrounding frontend stack for matching.

use crate::types::query::Seniority;

/// Matched term -> expanded skill cluster.
pub(crate) const SKILL_CLUSTERS: &[(&str, &[&str])] = &[
    ("react", &["javascript", "typescript", "frontend", "redux"]),
    ("vue", &["javascript", "frontend"]),
    ("angular", &["typescript", "javascript", "frontend"]),
    ("javascript", &["typescript", "node.js"]),
    ("typescript", &["javascript", "node.js"]),
    ("node.js", &["javascript", "express", "backend"]),
    ("python", &["django", "flask", "backend"]),
    ("django", &["python", "backend"]),
    ("flask", &["python", "backend"]),
    ("rust", &["systems programming", "backend"]),
    ("go", &["golang", "backend", "microservices"]),
    ("golang", &["go", "backend", "microservices"]),
    ("java", &["spring", "backend", "jvm"]),
    ("kotlin", &["java", "android", "jvm"]),
    ("swift", &["ios", "mobile"]),
    ("c++", &["systems programming"]),
    ("c#", &[".net", "backend"]),
    ("ruby", &["rails", "backend"]),
    ("php", &["laravel", "backend"]),
    ("machine learning", &["python", "tensorflow", "pytorch", "data science"]),
    ("deep learning", &["machine learning", "pytorch", "tensorflow"]),
    ("tensorflow", &["machine learning", "python"]),
    ("pytorch", &["machine learning", "python"]),
    ("nlp", &["machine learning", "python"]),
    ("data science", &["python", "pandas", "machine learning"]),
    ("ai", &["machine learning", "python"]),
    ("devops", &["docker", "kubernetes", "ci/cd"]),
    ("kubernetes", &["docker", "devops", "cloud"]),
    ("docker", &["devops", "containers"]),
    ("aws", &["cloud", "devops"]),
    ("gcp", &["cloud", "devops"]),
    ("azure", &["cloud", "devops"]),
    ("terraform", &["devops", "infrastructure as code"]),
    ("sql", &["postgresql", "databases"]),
    ("postgresql", &["sql", "databases"]),
    ("mongodb", &["nosql", "databases"]),
    ("redis", &["caching", "databases"]),
    ("graphql", &["api design", "backend"]),
    ("blockchain", &["solidity", "web3"]),
    ("solidity", &["blockchain", "web3"]),
    ("android", &["kotlin", "mobile"]),
    ("ios", &["swift", "mobile"]),
    ("flutter", &["dart", "mobile"]),
];

/// Skill terms that signal an AI/ML-leaning query.
pub(crate) const AI_ML_TERMS: &[&str] = &[
    "machine learning",
    "deep learning",
    "tensorflow",
    "pytorch",
    "nlp",
    "data science",
    "ai",
];

/// Skill terms that signal a backend/infrastructure-leaning query.
pub(crate) const BACKEND_TERMS: &[&str] = &[
    "backend",
    "sql",
    "postgresql",
    "mongodb",
    "redis",
    "microservices",
    "devops",
    "kubernetes",
    "docker",
];

/// Location alias -> canonical form. Aliases are matched in the query;
/// canonical forms populate `normalized_locations`.
pub(crate) const LOCATION_ALIASES: &[(&str, &str)] = &[
    ("sf", "san francisco"),
    ("san francisco", "san francisco"),
    ("bay area", "san francisco"),
    ("silicon valley", "san francisco"),
    ("nyc", "new york"),
    ("new york", "new york"),
    ("la", "los angeles"),
    ("los angeles", "los angeles"),
    ("seattle", "seattle"),
    ("austin", "austin"),
    ("boston", "boston"),
    ("chicago", "chicago"),
    ("london", "london"),
    ("berlin", "berlin"),
    ("amsterdam", "amsterdam"),
    ("paris", "paris"),
    ("toronto", "toronto"),
    ("vancouver", "vancouver"),
    ("bangalore", "bangalore"),
    ("singapore", "singapore"),
    ("sydney", "sydney"),
    ("remote", "remote"),
];

/// Role phrase -> canonical role type. Longer phrases listed first so they
/// win over their substrings.
pub(crate) const ROLE_TYPES: &[(&str, &str)] = &[
    ("data scientist", "data scientist"),
    ("data engineer", "data engineer"),
    ("machine learning engineer", "machine learning engineer"),
    ("engineering manager", "engineering manager"),
    ("product manager", "product manager"),
    ("full stack", "full stack engineer"),
    ("fullstack", "full stack engineer"),
    ("frontend", "frontend engineer"),
    ("front-end", "frontend engineer"),
    ("backend", "backend engineer"),
    ("back-end", "backend engineer"),
    ("devops", "devops engineer"),
    ("architect", "architect"),
    ("designer", "designer"),
    ("developer", "engineer"),
    ("engineer", "engineer"),
    ("programmer", "engineer"),
];

/// Seniority marker -> level. First match wins.
pub(crate) const SENIORITY_MARKERS: &[(&str, Seniority)] = &[
    ("principal", Seniority::Principal),
    ("staff", Seniority::Principal),
    ("lead", Seniority::Lead),
    ("senior", Seniority::Senior),
    ("sr", Seniority::Senior),
    ("mid-level", Seniority::Mid),
    ("junior", Seniority::Junior),
    ("jr", Seniority::Junior),
    ("entry level", Seniority::Junior),
];

/// Tokens carrying no search signal, dropped from cache fingerprints.
pub(crate) const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "the", "to", "with", "who", "want", "looking", "need", "find", "me", "some",
];
