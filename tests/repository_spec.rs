use casebook::models::*;
use casebook::store::{DocumentStore, MemoryStore};
use casebook::tree::ProjectTree;
use casebook::{RepoError, Repository};
use serde_json::json;
use speculate2::speculate;

fn create_test_project(repo: &Repository) -> Project {
    repo.create_project(CreateProjectInput {
        name: "Patient Portal".to_string(),
        description: Some("Online access to medical records".to_string()),
        compliance_frameworks: vec!["HIPAA".to_string()],
        ..Default::default()
    })
    .expect("Failed to create project")
}

fn epic_fields(name: &str) -> EpicFields {
    EpicFields {
        name: name.to_string(),
        description: None,
    }
}

fn feature_fields(name: &str) -> FeatureFields {
    FeatureFields {
        name: name.to_string(),
        description: None,
    }
}

fn use_case_fields(title: &str) -> UseCaseFields {
    UseCaseFields {
        title: title.to_string(),
        ..Default::default()
    }
}

fn test_case_fields(title: &str) -> TestCaseFields {
    TestCaseFields {
        title: title.to_string(),
        test_steps: vec!["Open the login page".to_string(), "Submit".to_string()],
        expected_result: "Dashboard is shown".to_string(),
        ..Default::default()
    }
}

/// Builds E001 → F001 → UC001 → TC001 and returns the project ID.
fn seed_branch(repo: &Repository) -> String {
    let project = create_test_project(repo);
    let id = project.project_id;
    repo.add_epic(&id, epic_fields("Authentication"), None).expect("add epic");
    repo.add_feature(&id, "E001", feature_fields("Login"), None).expect("add feature");
    repo.add_use_case(&id, "F001", use_case_fields("Valid login"), None).expect("add use case");
    repo.add_test_case(&id, "UC001", test_case_fields("Verify login"), None).expect("add test case");
    id
}

/// Every node hangs off a live parent of the level above, up to an epic.
fn assert_well_formed(project: Project) {
    let tree = ProjectTree::new(project).expect("stored document does not index");
    tree.check_integrity().expect("index out of sync");

    for id in tree.ids() {
        let level = tree.level_of(id).expect("indexed id has no level");
        let depth = Level::ALL.iter().position(|l| *l == level).expect("unknown level");
        let path = tree.ancestry(id);

        assert_eq!(path.len(), depth, "{id} has a broken ancestor chain");
        if let Some(root) = path.first() {
            assert_eq!(root.level, Level::Epic, "{id} is not under an epic");
        }
        assert_eq!(path.last().map(|s| s.id.as_str()), tree.parent_of(id));
    }
}

speculate! {
    before {
        let repo = Repository::in_memory();
    }

    describe "projects" {
        it "creates a project with a generated ID" {
            let project = create_test_project(&repo);

            assert!(project.project_id.starts_with("PROJ_"));
            assert_eq!(project.project_name, "Patient Portal");
            assert_eq!(project.status, ProjectStatus::Active);
            assert!(project.epics.is_empty());
        }

        it "rejects a blank name" {
            let result = repo.create_project(CreateProjectInput {
                name: "   ".to_string(),
                ..Default::default()
            });
            assert!(matches!(result, Err(RepoError::Validation(_))));
        }

        it "returns NotFound for unknown projects" {
            let result = repo.get_project("PROJ_missing");
            assert!(matches!(result, Err(RepoError::NotFound { kind: "project", .. })));
        }

        it "updates only the given fields" {
            let project = create_test_project(&repo);

            let updated = repo.update_project(&project.project_id, UpdateProjectInput {
                status: Some(ProjectStatus::OnHold),
                coverage_summary: Some("Login covered".to_string()),
                ..Default::default()
            }).expect("update failed");

            assert_eq!(updated.status, ProjectStatus::OnHold);
            assert_eq!(updated.coverage_summary.as_deref(), Some("Login covered"));
            assert_eq!(updated.project_name, "Patient Portal");
            assert_eq!(updated.compliance_frameworks, vec!["HIPAA"]);
        }

        it "deletes a project" {
            let project = create_test_project(&repo);
            repo.delete_project(&project.project_id).expect("delete failed");

            assert!(repo.get_project(&project.project_id).is_err());
            assert!(matches!(
                repo.delete_project(&project.project_id),
                Err(RepoError::NotFound { .. })
            ));
        }

        describe "list_projects" {
            it "returns summaries with counts" {
                let id = seed_branch(&repo);

                let projects = repo.list_projects(&ProjectFilter::default()).expect("list failed");
                assert_eq!(projects.len(), 1);
                assert_eq!(projects[0].project_id, id);
                assert_eq!(projects[0].epic_count, 1);
                assert_eq!(projects[0].test_case_count, 1);
            }

            it "filters by status, framework and text" {
                let portal = create_test_project(&repo);
                let billing = repo.create_project(CreateProjectInput {
                    name: "Billing".to_string(),
                    compliance_frameworks: vec!["PCI-DSS".to_string()],
                    ..Default::default()
                }).expect("create failed");
                repo.update_project(&billing.project_id, UpdateProjectInput {
                    status: Some(ProjectStatus::Archived),
                    ..Default::default()
                }).expect("update failed");

                let archived = repo.list_projects(&ProjectFilter {
                    status: Some(ProjectStatus::Archived),
                    ..Default::default()
                }).expect("list failed");
                assert_eq!(archived.len(), 1);
                assert_eq!(archived[0].project_id, billing.project_id);

                let hipaa = repo.list_projects(&ProjectFilter {
                    compliance_framework: Some("HIPAA".to_string()),
                    ..Default::default()
                }).expect("list failed");
                assert_eq!(hipaa.len(), 1);
                assert_eq!(hipaa[0].project_id, portal.project_id);

                let text = repo.list_projects(&ProjectFilter {
                    text_search: Some("medical".to_string()),
                    ..Default::default()
                }).expect("list failed");
                assert_eq!(text.len(), 1);
                assert_eq!(text[0].project_id, portal.project_id);
            }

            it "honours the limit" {
                for _ in 0..3 {
                    create_test_project(&repo);
                }
                let projects = repo.list_projects(&ProjectFilter {
                    limit: Some(2),
                    ..Default::default()
                }).expect("list failed");
                assert_eq!(projects.len(), 2);
            }
        }
    }

    describe "adding nodes" {
        it "mints sequential IDs per level" {
            let id = seed_branch(&repo);
            let second = repo.add_test_case(&id, "UC001", test_case_fields("Wrong password"), None)
                .expect("add failed");
            assert_eq!(second, "TC002");

            let project = repo.get_project(&id).expect("get failed");
            let uc = &project.epics[0].features[0].use_cases[0];
            let ids: Vec<&str> = uc.test_cases.iter().map(|t| t.test_case_id.as_str()).collect();
            assert_eq!(ids, vec!["TC001", "TC002"]);
        }

        it "starts new nodes in their default states" {
            let id = seed_branch(&repo);
            let project = repo.get_project(&id).expect("get failed");
            let epic = &project.epics[0];
            let tc = &epic.features[0].use_cases[0].test_cases[0];

            assert_eq!(epic.jira_status, JiraStatus::NotPushed);
            assert!(epic.jira_key.is_none());
            assert_eq!(tc.review_status, ReviewStatus::Pending);
            assert_eq!(tc.test_type, "Functional");
        }

        it "accepts an explicit ID" {
            let project = create_test_project(&repo);
            let id = repo.add_epic(&project.project_id, epic_fields("Billing"), Some("E100"))
                .expect("add failed");
            assert_eq!(id, "E100");

            let next = repo.add_epic(&project.project_id, epic_fields("Reports"), None)
                .expect("add failed");
            assert_eq!(next, "E101");
        }

        it "rejects an explicit ID already in use at any level" {
            let id = seed_branch(&repo);

            let same_level = repo.add_epic(&id, epic_fields("Dup"), Some("E001"));
            assert!(matches!(same_level, Err(RepoError::Conflict(_))));

            let other_level = repo.add_use_case(&id, "F001", use_case_fields("Dup"), Some("TC001"));
            assert!(matches!(other_level, Err(RepoError::Conflict(_))));
        }

        it "rejects a missing parent" {
            let project = create_test_project(&repo);
            let result = repo.add_feature(&project.project_id, "E404", feature_fields("Orphan"), None);
            assert!(matches!(result, Err(RepoError::NotFound { kind: "epic", .. })));
        }

        it "rejects a parent of the wrong level" {
            let id = seed_branch(&repo);
            let result = repo.add_test_case(&id, "F001", test_case_fields("Misplaced"), None);
            assert!(matches!(result, Err(RepoError::NotFound { .. })));
        }

        it "validates required test case fields before writing" {
            let id = seed_branch(&repo);
            let result = repo.add_test_case(&id, "UC001", TestCaseFields {
                title: "No steps".to_string(),
                expected_result: "Something".to_string(),
                ..Default::default()
            }, None);
            assert!(matches!(result, Err(RepoError::Validation(_))));
            assert_eq!(repo.statistics(&id).expect("stats").test_case_count, 1);
        }
    }

    describe "updating nodes" {
        it "patches only the given fields" {
            let id = seed_branch(&repo);

            let tc = repo.update_test_case(&id, "TC001", TestCasePatch {
                expected_result: Some("Dashboard greets the user".to_string()),
                review_status: Some(ReviewStatus::Approved),
                ..Default::default()
            }).expect("update failed");

            assert_eq!(tc.expected_result, "Dashboard greets the user");
            assert_eq!(tc.review_status, ReviewStatus::Approved);
            assert_eq!(tc.title, "Verify login");
            assert_eq!(tc.test_steps.len(), 2);
        }

        it "records reviewer comments on use cases" {
            let id = seed_branch(&repo);

            let uc = repo.update_use_case(&id, "UC001", UseCasePatch {
                review_status: Some(ReviewStatus::NeedsClarification),
                comments: Some("Which identity provider?".to_string()),
                ..Default::default()
            }).expect("update failed");

            assert_eq!(uc.review_status, ReviewStatus::NeedsClarification);
            assert_eq!(uc.comments.as_deref(), Some("Which identity provider?"));
        }

        it "renames epics and features" {
            let id = seed_branch(&repo);
            let epic = repo.update_epic(&id, "E001", EpicPatch {
                name: Some("Identity".to_string()),
                description: None,
            }).expect("update failed");
            let feature = repo.update_feature(&id, "F001", FeaturePatch {
                name: Some("Sign in".to_string()),
                description: Some("Password and SSO".to_string()),
            }).expect("update failed");

            assert_eq!(epic.epic_name, "Identity");
            assert_eq!(feature.feature_name, "Sign in");
            assert_eq!(feature.description.as_deref(), Some("Password and SSO"));
        }

        it "rejects an empty title" {
            let id = seed_branch(&repo);
            let result = repo.update_test_case(&id, "TC001", TestCasePatch {
                title: Some(String::new()),
                ..Default::default()
            });
            assert!(matches!(result, Err(RepoError::Validation(_))));
        }

        it "returns NotFound for unknown nodes" {
            let id = seed_branch(&repo);
            let result = repo.update_use_case(&id, "UC999", UseCasePatch::default());
            assert!(matches!(result, Err(RepoError::NotFound { .. })));
        }
    }

    describe "deleting nodes" {
        it "cascades to every descendant" {
            let id = seed_branch(&repo);
            repo.add_test_case(&id, "UC001", test_case_fields("Second"), None).expect("add failed");

            let removed = repo.delete_epic(&id, "E001").expect("delete failed");
            assert_eq!(removed[0], "E001");
            assert_eq!(removed.len(), 5);

            let stats = repo.statistics(&id).expect("stats failed");
            assert_eq!(stats.epic_count, 0);
            assert_eq!(stats.feature_count, 0);
            assert_eq!(stats.use_case_count, 0);
            assert_eq!(stats.test_case_count, 0);
        }

        it "never reuses deleted IDs" {
            let id = seed_branch(&repo);
            repo.delete_test_case(&id, "TC001").expect("delete failed");

            let minted = repo.add_test_case(&id, "UC001", test_case_fields("Again"), None)
                .expect("add failed");
            assert_eq!(minted, "TC002");

            let explicit = repo.add_test_case(&id, "UC001", test_case_fields("Again"), Some("TC001"));
            assert!(matches!(explicit, Err(RepoError::Conflict(_))));
        }

        it "checks the level guard" {
            let id = seed_branch(&repo);
            let result = repo.delete_node(&id, "F001", Some(Level::Epic));
            assert!(matches!(result, Err(RepoError::NotFound { .. })));
            assert!(repo.get_node(&id, "F001").is_ok());
        }

        it "deletes any level without a guard" {
            let id = seed_branch(&repo);
            let removed = repo.delete_node(&id, "UC001", None).expect("delete failed");
            assert_eq!(removed, vec!["UC001", "TC001"]);
            assert!(repo.get_node(&id, "TC001").is_err());
            assert!(repo.get_node(&id, "F001").is_ok());
        }
    }

    describe "jira sync" {
        it "records a successful push" {
            let id = seed_branch(&repo);
            let epic = repo.update_epic_jira_status(&id, "E001", JiraStatus::Pushed, Some("PORTAL-12"))
                .expect("sync failed");

            assert_eq!(epic.jira_status, JiraStatus::Pushed);
            assert_eq!(epic.jira_key.as_deref(), Some("PORTAL-12"));
            assert!(epic.jira_pushed_at.is_some());
        }

        it "is idempotent" {
            let id = seed_branch(&repo);
            let first = repo.update_epic_jira_status(&id, "E001", JiraStatus::Pushed, Some("PORTAL-12"))
                .expect("sync failed");
            let second = repo.update_epic_jira_status(&id, "E001", JiraStatus::Pushed, Some("PORTAL-12"))
                .expect("sync failed");

            assert_eq!(first.jira_pushed_at, second.jira_pushed_at);
        }

        it "lets a failed push be retried" {
            let id = seed_branch(&repo);
            repo.update_epic_jira_status(&id, "E001", JiraStatus::Failed, None).expect("sync failed");
            let epic = repo.update_epic_jira_status(&id, "E001", JiraStatus::Pushed, Some("PORTAL-7"))
                .expect("sync failed");

            assert_eq!(epic.jira_status, JiraStatus::Pushed);
            let stats = repo.statistics(&id).expect("stats failed");
            assert_eq!(stats.jira_sync_stats.pushed, 1);
            assert_eq!(stats.jira_sync_stats.failed, 0);
        }

        it "keeps the key when none is reported" {
            let id = seed_branch(&repo);
            repo.update_epic_jira_status(&id, "E001", JiraStatus::Pushed, Some("PORTAL-12"))
                .expect("sync failed");
            let epic = repo.update_epic_jira_status(&id, "E001", JiraStatus::Failed, None)
                .expect("sync failed");

            assert_eq!(epic.jira_key.as_deref(), Some("PORTAL-12"));
        }

        it "returns NotFound for a non-epic" {
            let id = seed_branch(&repo);
            let result = repo.update_epic_jira_status(&id, "F001", JiraStatus::Pushed, None);
            assert!(matches!(result, Err(RepoError::NotFound { .. })));
        }
    }

    describe "queries" {
        it "returns a node with its ancestor path" {
            let id = seed_branch(&repo);
            let located = repo.get_node(&id, "TC001").expect("get failed");

            assert_eq!(located.node.level(), Level::TestCase);
            let path: Vec<&str> = located.path.iter().map(|s| s.id.as_str()).collect();
            assert_eq!(path, vec!["E001", "F001", "UC001"]);
        }

        it "searches case-insensitively across levels" {
            let id = seed_branch(&repo);

            let matches = repo.search(&id, "LOGIN", None).expect("search failed");
            let ids: Vec<&str> = matches.iter().map(|m| m.node.id()).collect();
            assert_eq!(ids, vec!["F001", "UC001", "TC001"]);

            let only_tests = repo.search(&id, "login", Some(Level::TestCase)).expect("search failed");
            assert_eq!(only_tests.len(), 1);
            assert_eq!(only_tests[0].path.len(), 3);
        }

        it "rejects an empty search term" {
            let id = seed_branch(&repo);
            assert!(matches!(repo.search(&id, "  ", None), Err(RepoError::Validation(_))));
        }

        it "keeps statistics consistent with the tree" {
            let id = seed_branch(&repo);
            repo.add_test_case(&id, "UC001", TestCaseFields {
                test_type: Some("Security".to_string()),
                compliance_mapping: vec!["HIPAA 164.312(d)".to_string()],
                ..test_case_fields("Lockout")
            }, None).expect("add failed");

            let project = repo.get_project(&id).expect("get failed");
            let stats = repo.statistics(&id).expect("stats failed");

            assert_eq!(stats.test_case_count, project.test_case_count());
            assert_eq!(stats.test_type_distribution.get("Functional"), Some(&1));
            assert_eq!(stats.test_type_distribution.get("Security"), Some(&1));
            assert_eq!(stats.review_status_distribution.get("Pending"), Some(&3));
            assert_eq!(stats.compliance_coverage, vec!["HIPAA 164.312(d)"]);
            assert_eq!(stats.jira_sync_stats.not_pushed, 1);
        }
    }

    describe "tree integrity" {
        it "leaves no orphans after mixed edits and imports" {
            let id = seed_branch(&repo);

            repo.import_structure(&id, &json!({
                "epics": [{
                    "epic_name": "Billing",
                    "features": [{
                        "feature_name": "Invoices",
                        "use_cases": [{
                            "title": "Pay an invoice",
                            "test_cases": [{
                                "title": "Pay by card",
                                "test_steps": ["open invoice", "pay"],
                                "expected_result": "invoice marked paid"
                            }]
                        }]
                    }]
                }]
            })).expect("import failed");

            repo.add_feature(&id, "E002", feature_fields("Statements"), None).expect("add feature");
            repo.add_use_case(&id, "F001", use_case_fields("Remember me"), None).expect("add use case");
            repo.add_test_case(&id, "UC003", test_case_fields("Cookie survives restart"), None)
                .expect("add test case");
            repo.update_test_case(&id, "TC001", TestCasePatch {
                review_status: Some(ReviewStatus::Approved),
                ..Default::default()
            }).expect("review failed");
            repo.update_feature(&id, "F003", FeaturePatch {
                name: Some("Monthly statements".to_string()),
                ..Default::default()
            }).expect("rename failed");

            let removed = repo.delete_feature(&id, "F001").expect("delete failed");
            assert_eq!(removed.len(), 5);

            repo.import_structure(&id, &json!({
                "epics": [{
                    "epic_id": "E002",
                    "epic_name": "Billing",
                    "features": [
                        { "feature_id": "F002", "feature_name": "Invoices" },
                        { "feature_name": "Refunds", "use_cases": null }
                    ]
                }],
                "use_cases": [{ "feature_id": "F003", "title": "Download a statement" }],
                "test_cases": [{
                    "use_case_id": "UC001",
                    "title": "Under a deleted parent",
                    "test_steps": ["submit"],
                    "expected_result": "skipped"
                }]
            })).expect("re-import failed");

            let project = repo.get_project(&id).expect("get failed");
            assert_eq!(project.epics.len(), 2);
            assert!(project.epics[0].features.is_empty());
            assert_well_formed(project);
        }

        it "reports a stored document with duplicate IDs as corrupt" {
            let store = MemoryStore::new();
            let repo = Repository::new(store.clone());
            let id = seed_branch(&repo);

            let (mut project, version) = store.load(&id).expect("load failed");
            let copy = project.epics[0].clone();
            project.epics.push(copy);
            store.commit_if_unchanged(&id, version, &project).expect("commit failed");

            assert!(matches!(repo.get_project(&id), Err(RepoError::Corrupt(_))));
        }
    }
}
