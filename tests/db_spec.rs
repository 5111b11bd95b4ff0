use leadline::db::Database;
use leadline::error::Error;
use leadline::models::*;
use speculate2::speculate;
use uuid::Uuid;

const OPERATOR: Uuid = Uuid::nil();

fn create_test_agent(db: &Database, name: &str) -> Agent {
    db.create_agent(
        OPERATOR,
        CreateAgentInput {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            mobile: "555-0100".to_string(),
            password: "hunter2hunter2".to_string(),
        },
    )
    .expect("Failed to create agent")
}

fn rows(n: usize) -> Vec<ImportRow> {
    (0..n)
        .map(|i| ImportRow {
            first_name: format!("Lead{}", i),
            phone: format!("555-{:04}", i),
            notes: None,
        })
        .collect()
}

fn owned_names(db: &Database, agent_id: Uuid) -> Vec<String> {
    db.get_agent_leads(agent_id)
        .expect("Query failed")
        .into_iter()
        .map(|l| l.first_name)
        .collect()
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "agents" {
        describe "create_agent" {
            it "creates an agent with the caller as creator" {
                let agent = create_test_agent(&db, "Alice");

                assert_eq!(agent.name, "Alice");
                assert_eq!(agent.email, "alice@example.com");
                assert_eq!(agent.created_by, OPERATOR);

                let found = db.get_agent(agent.id).expect("Query failed");
                assert_eq!(found.unwrap().email, "alice@example.com");
            }

            it "rejects a duplicate email before any mutation" {
                create_test_agent(&db, "Alice");

                let err = db.create_agent(OPERATOR, CreateAgentInput {
                    name: "Other Alice".to_string(),
                    email: "alice@example.com".to_string(),
                    mobile: "555-0199".to_string(),
                    password: "hunter2hunter2".to_string(),
                }).unwrap_err();

                assert!(matches!(err, Error::Validation(_)));
                assert_eq!(db.get_all_agents().expect("Query failed").len(), 1);
            }

            it "does not store the plaintext credential on the model" {
                let agent = create_test_agent(&db, "Alice");
                let json = serde_json::to_value(&agent).unwrap();
                assert!(json.get("password").is_none());
                assert!(json.get("password_hash").is_none());
            }
        }

        describe "get_all_agents" {
            it "returns agents in roster (insertion) order" {
                create_test_agent(&db, "Zed");
                create_test_agent(&db, "Amy");

                let agents = db.get_all_agents().expect("Query failed");
                let names: Vec<&str> = agents.iter().map(|a| a.name.as_str()).collect();
                assert_eq!(names, vec!["Zed", "Amy"]);
            }
        }

        describe "get_agents_with_leads" {
            it "expands each agent's owned leads" {
                let a1 = create_test_agent(&db, "Alice");
                let a2 = create_test_agent(&db, "Bob");
                db.import_leads(OPERATOR, &rows(3)).expect("Import failed");

                let expanded = db.get_agents_with_leads().expect("Query failed");
                assert_eq!(expanded.len(), 2);
                assert_eq!(expanded[0].agent.id, a1.id);
                assert_eq!(expanded[0].leads.len(), 2);
                assert_eq!(expanded[1].agent.id, a2.id);
                assert_eq!(expanded[1].leads.len(), 1);
            }
        }
    }

    describe "bulk import" {
        it "rejects an import when no agents exist, inserting nothing" {
            let err = db.import_leads(OPERATOR, &rows(3)).unwrap_err();

            assert!(matches!(err, Error::NoAgents));
            assert!(db.get_all_leads().expect("Query failed").is_empty());
        }

        it "rejects an empty row set" {
            create_test_agent(&db, "Alice");
            let err = db.import_leads(OPERATOR, &[]).unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }

        it "assigns every imported lead" {
            create_test_agent(&db, "Alice");
            let inserted = db.import_leads(OPERATOR, &rows(4)).expect("Import failed");

            assert_eq!(inserted.len(), 4);
            assert!(inserted.iter().all(|l| l.assigned_agent.is_some()));
        }

        // Scenario A: 2 agents, 5 valid rows -> indices 0,2,4 and 1,3.
        it "splits five rows across two agents round-robin" {
            let a1 = create_test_agent(&db, "Alice");
            let a2 = create_test_agent(&db, "Bob");

            db.import_leads(OPERATOR, &rows(5)).expect("Import failed");

            assert_eq!(owned_names(&db, a1.id), vec!["Lead0", "Lead2", "Lead4"]);
            assert_eq!(owned_names(&db, a2.id), vec!["Lead1", "Lead3"]);
        }

        it "distributes maximally evenly" {
            let agents: Vec<Agent> = ["A", "B", "C"].iter()
                .map(|n| create_test_agent(&db, n))
                .collect();

            db.import_leads(OPERATOR, &rows(11)).expect("Import failed");

            let counts: Vec<usize> = agents.iter()
                .map(|a| db.get_agent_leads(a.id).expect("Query failed").len())
                .collect();
            assert_eq!(counts.iter().sum::<usize>(), 11);
            assert!(counts.iter().max().unwrap() - counts.iter().min().unwrap() <= 1);
        }
    }

    describe "full redistribution on agent creation" {
        // Scenario B: 2 agents with 2 leads each; a 3rd agent joins and all
        // 4 leads are reshuffled over 3 agents in original creation order.
        it "reshuffles all leads across the enlarged roster" {
            let a1 = create_test_agent(&db, "Alice");
            let a2 = create_test_agent(&db, "Bob");
            db.import_leads(OPERATOR, &rows(4)).expect("Import failed");

            assert_eq!(owned_names(&db, a1.id), vec!["Lead0", "Lead2"]);
            assert_eq!(owned_names(&db, a2.id), vec!["Lead1", "Lead3"]);

            let a3 = create_test_agent(&db, "Cara");

            assert_eq!(owned_names(&db, a1.id), vec!["Lead0", "Lead3"]);
            assert_eq!(owned_names(&db, a2.id), vec!["Lead1"]);
            assert_eq!(owned_names(&db, a3.id), vec!["Lead2"]);
        }

        it "leaves the new agent empty when there are no leads" {
            create_test_agent(&db, "Alice");
            let a2 = create_test_agent(&db, "Bob");

            assert!(db.get_agent_leads(a2.id).expect("Query failed").is_empty());
        }

        it "gives the sole agent everything it can own" {
            let a1 = create_test_agent(&db, "Alice");
            db.import_leads(OPERATOR, &rows(3)).expect("Import failed");

            assert_eq!(db.get_agent_leads(a1.id).expect("Query failed").len(), 3);
        }

        it "is deterministic for a fixed roster and lead order" {
            // Two stores built through the identical sequence of operations
            // end up with the identical assignment pattern.
            let pattern = |db: &Database| -> Vec<(String, String)> {
                db.get_leads_with_agents().expect("Query failed")
                    .into_iter()
                    .map(|l| (l.lead.first_name, l.agent.expect("unassigned lead").name))
                    .collect()
            };

            let build = || {
                let db = Database::open_memory().expect("Failed to create database");
                db.migrate().expect("Failed to run migrations");
                create_test_agent(&db, "Alice");
                create_test_agent(&db, "Bob");
                db.import_leads(OPERATOR, &rows(6)).expect("Import failed");
                create_test_agent(&db, "Cara");
                db
            };

            assert_eq!(pattern(&build()), pattern(&build()));
        }
    }

    describe "partial redistribution on agent deletion" {
        it "returns not-found for an unknown agent" {
            let err = db.delete_agent(OPERATOR, Uuid::new_v4()).unwrap_err();
            assert!(matches!(err, Error::NotFound(_)));
        }

        it "rejects deletion by anyone but the creator" {
            let agent = create_test_agent(&db, "Alice");

            let stranger = Uuid::new_v4();
            let err = db.delete_agent(stranger, agent.id).unwrap_err();

            assert!(matches!(err, Error::Forbidden(_)));
            assert!(db.get_agent(agent.id).expect("Query failed").is_some());
        }

        // Scenario C: departing agent's leads alternate over the remaining
        // roster in the order they sat in its collection.
        it "hands the departing agent's leads to the remaining roster" {
            let a1 = create_test_agent(&db, "Alice");
            let a2 = create_test_agent(&db, "Bob");
            let a3 = create_test_agent(&db, "Cara");
            db.import_leads(OPERATOR, &rows(6)).expect("Import failed");

            // a2 owns Lead1 and Lead4.
            assert_eq!(owned_names(&db, a2.id), vec!["Lead1", "Lead4"]);

            db.delete_agent(OPERATOR, a2.id).expect("Delete failed");

            // Lead1 -> a1, Lead4 -> a3; survivors keep their own leads.
            assert_eq!(owned_names(&db, a1.id), vec!["Lead0", "Lead1", "Lead3"]);
            assert_eq!(owned_names(&db, a3.id), vec!["Lead2", "Lead4", "Lead5"]);
            assert!(db.get_agent(a2.id).expect("Query failed").is_none());
        }

        it "conserves the total lead count when agents remain" {
            create_test_agent(&db, "Alice");
            let a2 = create_test_agent(&db, "Bob");
            db.import_leads(OPERATOR, &rows(7)).expect("Import failed");

            db.delete_agent(OPERATOR, a2.id).expect("Delete failed");

            let leads = db.get_all_leads().expect("Query failed");
            assert_eq!(leads.len(), 7);
            assert!(leads.iter().all(|l| l.assigned_agent.is_some()));
        }

        // Scenario D: deleting the last agent deletes its leads outright.
        it "deletes all leads when the last agent departs" {
            let a1 = create_test_agent(&db, "Alice");
            db.import_leads(OPERATOR, &rows(3)).expect("Import failed");

            db.delete_agent(OPERATOR, a1.id).expect("Delete failed");

            assert!(db.get_all_leads().expect("Query failed").is_empty());
            assert!(db.get_all_agents().expect("Query failed").is_empty());
        }

        it "does no redistribution work for an agent with no leads" {
            let a1 = create_test_agent(&db, "Alice");
            let a2 = create_test_agent(&db, "Bob");
            db.import_leads(OPERATOR, &rows(2)).expect("Import failed");

            // Reshuffle on Cara's arrival gives her nothing to hand back.
            let a3 = create_test_agent(&db, "Cara");
            let before: usize = db.get_all_leads().expect("Query failed").len();
            assert!(db.get_agent_leads(a3.id).expect("Query failed").is_empty());

            db.delete_agent(OPERATOR, a3.id).expect("Delete failed");

            assert_eq!(db.get_all_leads().expect("Query failed").len(), before);
            assert_eq!(owned_names(&db, a1.id), vec!["Lead0"]);
            assert_eq!(owned_names(&db, a2.id), vec!["Lead1"]);
        }
    }

    describe "individual leads" {
        it "assigns a new lead to the least-loaded agent" {
            create_test_agent(&db, "Alice");
            let a2 = create_test_agent(&db, "Bob");
            db.import_leads(OPERATOR, &rows(3)).expect("Import failed");

            let lead = db.create_lead(OPERATOR, CreateLeadInput {
                first_name: "Walk-in".to_string(),
                phone: "555-9999".to_string(),
                notes: Some("from the front desk".to_string()),
            }).expect("Create failed");

            assert_eq!(lead.assigned_agent, Some(a2.id));
        }

        it "rejects individual creation with an empty roster" {
            let err = db.create_lead(OPERATOR, CreateLeadInput {
                first_name: "Walk-in".to_string(),
                phone: "555-9999".to_string(),
                notes: None,
            }).unwrap_err();

            assert!(matches!(err, Error::NoAgents));
        }

        it "deletes one lead without touching the rest" {
            let a1 = create_test_agent(&db, "Alice");
            db.import_leads(OPERATOR, &rows(3)).expect("Import failed");

            let victim = db.get_agent_leads(a1.id).expect("Query failed")[1].id;
            db.delete_lead(victim).expect("Delete failed");

            assert_eq!(owned_names(&db, a1.id), vec!["Lead0", "Lead2"]);
        }

        it "returns not-found when deleting an unknown lead" {
            let err = db.delete_lead(Uuid::new_v4()).unwrap_err();
            assert!(matches!(err, Error::NotFound(_)));
        }

        it "expands the owning agent in lead listings" {
            create_test_agent(&db, "Alice");
            db.import_leads(OPERATOR, &rows(1)).expect("Import failed");

            let leads = db.get_leads_with_agents().expect("Query failed");
            assert_eq!(leads.len(), 1);
            let agent = leads[0].agent.as_ref().expect("missing agent expansion");
            assert_eq!(agent.name, "Alice");
            assert_eq!(agent.email, "alice@example.com");
        }
    }

    describe "integrity" {
        it "reports zero orphaned assignments across the lifecycle" {
            let a1 = create_test_agent(&db, "Alice");
            create_test_agent(&db, "Bob");
            db.import_leads(OPERATOR, &rows(5)).expect("Import failed");
            create_test_agent(&db, "Cara");
            db.delete_agent(OPERATOR, a1.id).expect("Delete failed");

            assert_eq!(db.count_orphaned_leads().expect("Query failed"), 0);
        }
    }
}
