//! Seeded configuration: onboarding phases, knowledge paths, resources and
//! achievement rules. Loaded once and immutable afterwards.

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::achievement::AchievementRules;
use crate::error::CatalogError;
use crate::model::{
    Difficulty, KnowledgePath, PathId, PathSummary, PhaseTemplate, Step, StepId, StepKind,
    TaskKind, TaskPriority, TaskTemplate,
};
use crate::resources::ResourceRegistry;

/// On-disk catalog shape.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    onboarding: Vec<PhaseTemplate>,
    #[serde(default)]
    knowledge_paths: Vec<KnowledgePath>,
    #[serde(default)]
    resources: Option<BTreeMap<String, String>>,
    #[serde(default)]
    achievements: Option<AchievementRules>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    phases: Vec<PhaseTemplate>,
    paths: Vec<KnowledgePath>,
    resources: ResourceRegistry,
    achievements: AchievementRules,
}

impl Catalog {
    /// Validate and assemble a catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for empty or duplicate phase titles, task names,
    /// path ids or step ids.
    pub fn new(
        phases: Vec<PhaseTemplate>,
        paths: Vec<KnowledgePath>,
        resources: ResourceRegistry,
        achievements: AchievementRules,
    ) -> Result<Self, CatalogError> {
        validate_phases(&phases)?;
        validate_paths(&paths)?;
        Ok(Self {
            phases,
            paths,
            resources,
            achievements,
        })
    }

    /// Parse a JSON catalog. Missing `resources` and `achievements` fall back
    /// to the built-in sets.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Json` for malformed input or unknown fields, and
    /// the validation errors of [`Catalog::new`].
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        let resources = match file.resources {
            Some(raw) => ResourceRegistry::from_raw(raw)?,
            None => ResourceRegistry::builtin(),
        };
        Self::new(
            file.onboarding,
            file.knowledge_paths,
            resources,
            file.achievements.unwrap_or_default(),
        )
    }

    #[must_use]
    pub fn builtin() -> Self {
        Self {
            phases: builtin_phases(),
            paths: builtin_paths(),
            resources: ResourceRegistry::builtin(),
            achievements: AchievementRules::builtin(),
        }
    }

    #[must_use]
    pub fn with_achievements(mut self, achievements: AchievementRules) -> Self {
        self.achievements = achievements;
        self
    }

    #[must_use]
    pub fn phases(&self) -> &[PhaseTemplate] {
        &self.phases
    }

    #[must_use]
    pub fn phase(&self, title: &str) -> Option<&PhaseTemplate> {
        self.phases.iter().find(|p| p.title == title)
    }

    #[must_use]
    pub fn paths(&self) -> &[KnowledgePath] {
        &self.paths
    }

    #[must_use]
    pub fn path(&self, id: &PathId) -> Option<&KnowledgePath> {
        self.paths.iter().find(|p| &p.id == id)
    }

    /// Summaries of paths matching the optional filters, in catalog order.
    #[must_use]
    pub fn path_summaries(
        &self,
        category: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> Vec<PathSummary> {
        self.paths
            .iter()
            .filter(|p| category.is_none_or(|c| p.category.eq_ignore_ascii_case(c)))
            .filter(|p| difficulty.is_none_or(|d| p.difficulty == d))
            .map(KnowledgePath::summary)
            .collect()
    }

    #[must_use]
    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    #[must_use]
    pub fn achievements(&self) -> &AchievementRules {
        &self.achievements
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn validate_phases(phases: &[PhaseTemplate]) -> Result<(), CatalogError> {
    let mut titles = HashSet::new();
    for phase in phases {
        if phase.title.trim().is_empty() {
            return Err(CatalogError::EmptyPhaseTitle);
        }
        if !titles.insert(phase.title.as_str()) {
            return Err(CatalogError::DuplicatePhase(phase.title.clone()));
        }
        let mut names = HashSet::new();
        for task in &phase.tasks {
            if task.name.trim().is_empty() {
                return Err(CatalogError::EmptyTaskName {
                    phase: phase.title.clone(),
                });
            }
            if !names.insert(task.name.as_str()) {
                return Err(CatalogError::DuplicateTask {
                    phase: phase.title.clone(),
                    task: task.name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_paths(paths: &[KnowledgePath]) -> Result<(), CatalogError> {
    let mut ids = HashSet::new();
    for path in paths {
        if !ids.insert(&path.id) {
            return Err(CatalogError::DuplicatePath(path.id.clone()));
        }
        let mut steps = HashSet::new();
        for step in &path.steps {
            if !steps.insert(&step.id) {
                return Err(CatalogError::DuplicateStep {
                    path: path.id.clone(),
                    step: step.id.clone(),
                });
            }
        }
    }
    Ok(())
}

//
// ─── BUILT-IN DATA ─────────────────────────────────────────────────────────────
//

fn task(name: &str, kind: TaskKind, priority: TaskPriority, resources: &[&str]) -> TaskTemplate {
    TaskTemplate::new(name, kind, priority).with_resources(resources)
}

fn builtin_phases() -> Vec<PhaseTemplate> {
    use TaskKind as K;
    use TaskPriority::{High, Low, Medium};

    vec![
        PhaseTemplate::new("Foundation Setup", "1-2 days")
            .with_task(
                task(
                    "Install Development Tools",
                    K::Setup,
                    High,
                    &["IDE Setup Guide", "Git Configuration"],
                )
                .with_description("Install the IDE, toolchains and git hooks"),
            )
            .with_task(task(
                "Get Repository Access",
                K::Access,
                High,
                &["Repository Access", "SSH Key Setup"],
            ))
            .with_task(task(
                "Join Team Channels",
                K::Social,
                Medium,
                &["Slack Invite", "Team Calendar"],
            )),
        PhaseTemplate::new("Architecture Deep Dive", "3-5 days")
            .with_task(task(
                "Review System Architecture",
                K::Documentation,
                High,
                &["Architecture Docs", "System Diagrams"],
            ))
            .with_task(task(
                "Understand Data Flow",
                K::Database,
                Medium,
                &["Data Flow Diagrams", "API Documentation"],
            ))
            .with_task(task(
                "Learn Coding Standards",
                K::Standards,
                Medium,
                &["Style Guide", "Best Practices"],
            )),
        PhaseTemplate::new("Codebase Exploration", "1 week")
            .with_task(task(
                "Explore Project Structure",
                K::Code,
                High,
                &["Project Map", "README Files"],
            ))
            .with_task(task(
                "Read Component Documentation",
                K::Documentation,
                Medium,
                &["Component Docs", "Code Comments"],
            ))
            .with_task(task(
                "Run Test Suite",
                K::Testing,
                Low,
                &["Test Guide", "Coverage Reports"],
            )),
        PhaseTemplate::new("Workflow & Processes", "2-3 days")
            .with_task(task(
                "Learn Git Workflow",
                K::Workflow,
                High,
                &["Git Guide", "Branch Strategy"],
            ))
            .with_task(task(
                "Understand Code Review Process",
                K::Process,
                Medium,
                &["Review Guidelines", "PR Templates"],
            ))
            .with_task(task(
                "Learn Deployment Process",
                K::Devops,
                Low,
                &["Deployment Guide", "Environment Docs"],
            )),
        PhaseTemplate::new("First Contribution", "1-2 weeks")
            .with_task(task(
                "Pick First Task",
                K::Task,
                High,
                &["Issue Tracker", "Task Board"],
            ))
            .with_task(task(
                "Implement Feature",
                K::Development,
                High,
                &["Development Guide", "Code Examples"],
            ))
            .with_task(task(
                "Submit Pull Request",
                K::Collaboration,
                Medium,
                &["PR Guidelines", "Review Checklist"],
            )),
    ]
}

struct StepSeed<'a> {
    title: &'a str,
    kind: StepKind,
    content: &'a str,
    resource_url: &'a str,
    estimated_time: &'a str,
    required: bool,
}

fn steps(seeds: &[StepSeed<'_>]) -> Vec<Step> {
    seeds
        .iter()
        .zip(1_u32..)
        .filter_map(|(seed, order)| {
            Some(Step {
                id: StepId::new(format!("step-{order}")).ok()?,
                title: seed.title.to_owned(),
                kind: seed.kind,
                content: seed.content.to_owned(),
                resource_url: seed.resource_url.to_owned(),
                estimated_time: Some(seed.estimated_time.to_owned()),
                required: seed.required,
                order,
            })
        })
        .collect()
}

fn path(
    id: &str,
    title: &str,
    description: &str,
    estimated_time: &str,
    difficulty: Difficulty,
    category: &str,
    seeds: &[StepSeed<'_>],
) -> Option<KnowledgePath> {
    Some(KnowledgePath {
        id: PathId::new(id).ok()?,
        title: title.to_owned(),
        description: description.to_owned(),
        estimated_time: estimated_time.to_owned(),
        difficulty,
        category: category.to_owned(),
        steps: steps(seeds),
    })
}

#[allow(clippy::too_many_lines)]
fn builtin_paths() -> Vec<KnowledgePath> {
    [
        path(
            "new-developer",
            "New Developer Onboarding",
            "Complete guide for new developers joining the team",
            "2-3 hours",
            Difficulty::Beginner,
            "onboarding",
            &[
                StepSeed {
                    title: "Project Overview",
                    kind: StepKind::Document,
                    content: "Read the project overview document to understand our architecture",
                    resource_url: "/docs/project-overview",
                    estimated_time: "15 minutes",
                    required: true,
                },
                StepSeed {
                    title: "API Design Introduction",
                    kind: StepKind::Video,
                    content: "Watch the API design introduction video",
                    resource_url: "/videos/api-design-intro",
                    estimated_time: "30 minutes",
                    required: true,
                },
                StepSeed {
                    title: "Review GitHub PR #42",
                    kind: StepKind::CodeReview,
                    content: "Review the authentication service PR to learn the review process",
                    resource_url: "https://github.com/company/repo/pull/42",
                    estimated_time: "45 minutes",
                    required: true,
                },
                StepSeed {
                    title: "Ask AI Assistant",
                    kind: StepKind::AiInteraction,
                    content: "Ask the AI assistant about our deployment process",
                    resource_url: "/ai/chat",
                    estimated_time: "20 minutes",
                    required: false,
                },
                StepSeed {
                    title: "Complete Quiz",
                    kind: StepKind::Quiz,
                    content: "Take a quiz to test your understanding",
                    resource_url: "/quiz/onboarding",
                    estimated_time: "15 minutes",
                    required: true,
                },
            ],
        ),
        path(
            "api-developer",
            "API Developer Path",
            "Specialized path for API developers",
            "4-5 hours",
            Difficulty::Intermediate,
            "development",
            &[
                StepSeed {
                    title: "API Design Principles",
                    kind: StepKind::Document,
                    content: "Study our API design principles and best practices",
                    resource_url: "/docs/api-design-principles",
                    estimated_time: "45 minutes",
                    required: true,
                },
                StepSeed {
                    title: "Authentication Flow",
                    kind: StepKind::Interactive,
                    content: "Complete the interactive authentication flow tutorial",
                    resource_url: "/tutorials/auth-flow",
                    estimated_time: "60 minutes",
                    required: true,
                },
                StepSeed {
                    title: "Code Review Practice",
                    kind: StepKind::CodeReview,
                    content: "Review and provide feedback on a sample API endpoint",
                    resource_url: "/practice/code-review",
                    estimated_time: "30 minutes",
                    required: false,
                },
                StepSeed {
                    title: "Ask About Versioning",
                    kind: StepKind::AiInteraction,
                    content: "Ask the AI assistant how API versions are rolled out",
                    resource_url: "/ai/chat",
                    estimated_time: "15 minutes",
                    required: false,
                },
            ],
        ),
        path(
            "security-engineer",
            "Security Engineer Path",
            "Comprehensive security training path",
            "6-8 hours",
            Difficulty::Advanced,
            "security",
            &[
                StepSeed {
                    title: "Security Fundamentals",
                    kind: StepKind::Document,
                    content: "Review security fundamentals and our security policies",
                    resource_url: "/docs/security-fundamentals",
                    estimated_time: "90 minutes",
                    required: true,
                },
                StepSeed {
                    title: "Penetration Testing",
                    kind: StepKind::Lab,
                    content: "Complete the hands-on penetration testing lab",
                    resource_url: "/labs/penetration-testing",
                    estimated_time: "120 minutes",
                    required: true,
                },
                StepSeed {
                    title: "Security Code Review",
                    kind: StepKind::CodeReview,
                    content: "Perform a security-focused code review",
                    resource_url: "/security/code-review",
                    estimated_time: "60 minutes",
                    required: true,
                },
            ],
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_passes_validation() {
        let builtin = Catalog::builtin();
        let validated = Catalog::new(
            builtin.phases().to_vec(),
            builtin.paths().to_vec(),
            builtin.resources().clone(),
            builtin.achievements().clone(),
        )
        .unwrap();
        assert_eq!(validated.phases().len(), 5);
        assert_eq!(validated.paths().len(), 3);
    }

    #[test]
    fn builtin_resources_cover_every_task_link() {
        let catalog = Catalog::builtin();
        for phase in catalog.phases() {
            for task in &phase.tasks {
                for name in &task.resources {
                    assert!(catalog.resources().contains(name), "missing {name}");
                }
            }
        }
    }

    #[test]
    fn api_developer_has_two_required_steps_of_four() {
        let catalog = Catalog::builtin();
        let summary = catalog
            .path(&PathId::new("api-developer").unwrap())
            .unwrap()
            .summary();
        assert_eq!(summary.total_steps, 4);
        assert_eq!(summary.required_steps, 2);
    }

    #[test]
    fn path_summaries_filter_by_category_and_difficulty() {
        let catalog = Catalog::builtin();
        let security = catalog.path_summaries(Some("Security"), None);
        assert_eq!(security.len(), 1);
        assert_eq!(security[0].id.as_str(), "security-engineer");

        let beginner = catalog.path_summaries(None, Some(Difficulty::Beginner));
        assert_eq!(beginner.len(), 1);

        assert!(catalog
            .path_summaries(Some("security"), Some(Difficulty::Beginner))
            .is_empty());
        assert_eq!(catalog.path_summaries(None, None).len(), 3);
    }

    #[test]
    fn from_json_rejects_duplicate_tasks() {
        let raw = r#"{
            "onboarding": [
                { "title": "Foundation Setup", "tasks": [ { "name": "A" }, { "name": "A" } ] }
            ]
        }"#;
        let err = Catalog::from_json(raw).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateTask { .. }));
    }

    #[test]
    fn from_json_rejects_unknown_fields() {
        let raw = r#"{ "onboarding": [], "users": [] }"#;
        assert!(matches!(
            Catalog::from_json(raw).unwrap_err(),
            CatalogError::Json(_)
        ));
    }

    #[test]
    fn from_json_falls_back_to_builtin_resources_and_rules() {
        let raw = r#"{ "onboarding": [ { "title": "Only", "tasks": [ { "name": "A" } ] } ] }"#;
        let catalog = Catalog::from_json(raw).unwrap();
        assert_eq!(catalog.phases().len(), 1);
        assert!(catalog.paths().is_empty());
        assert!(!catalog.resources().is_empty());
        assert_eq!(catalog.achievements(), &AchievementRules::builtin());
    }
}
