//! End-to-end turns through a coordinator built from mocks
//!
//! Each test scripts the classifier output and the scraped pages, runs one or
//! more turns, and checks the reply together with the side effects: cache
//! entries, scrape requests, and how many times the LLM was called.


use course_advisor::agent::{cache_key, QUOTA_EXHAUSTED_MESSAGE};
use course_advisor::llm::LlmError;
use course_advisor::scraper::ScrapeError;
use course_advisor::testing::mocks::{MockLlmProvider, MockScrapeGateway};
use serde_json::json;
use test_helpers::*;

#[tokio::test]
async fn test_course_question_scrapes_caches_and_answers() {
    let provider = MockLlmProvider::new(vec![
        decision(
            "CourseAgent",
            json!({"course_code": "CMPUT 174", "university": "University of Alberta", "question": "What are the prerequisites?"}),
        ),
        "You need Math 30-1.".to_string(),
    ]);
    let scraper = MockScrapeGateway::new().with_page(CMPUT_174_URL, CMPUT_174_PAGE);
    let (mut coordinator, provider, scraper) =
        mock_coordinator(&test_config(), provider, scraper, false);

    let reply = coordinator
        .execute("What are the prerequisites for CMPUT 174?")
        .await;

    assert_eq!(reply, "You need Math 30-1.");
    assert_eq!(scraper.requested_urls().await, vec![CMPUT_174_URL]);
    assert!(coordinator.cache().contains("UALBERTA:CMPUT 174"));
    assert_eq!(coordinator.last_action(), Some("Called CourseAgent"));

    let requests = provider.get_requests().await;
    assert_eq!(requests.len(), 2);
    let answer_prompt = &requests[1].messages[0].content;
    assert!(answer_prompt.contains("Prerequisites: Math 30-1 or equivalent."));
    assert!(answer_prompt.contains("User Question: What are the prerequisites?"));
}

#[tokio::test]
async fn test_repeated_course_question_uses_cache() {
    let course_decision = decision("CourseAgent", json!({"course_code": "cmput  174"}));
    let provider = MockLlmProvider::new(vec![
        course_decision.clone(),
        "first answer".to_string(),
        course_decision,
        "second answer".to_string(),
    ]);
    let scraper = MockScrapeGateway::new().with_page(CMPUT_174_URL, CMPUT_174_PAGE);
    let (mut coordinator, provider, scraper) =
        mock_coordinator(&test_config(), provider, scraper, false);

    assert_eq!(coordinator.execute("Tell me about CMPUT 174").await, "first answer");
    assert_eq!(coordinator.execute("And cmput 174 again?").await, "second answer");

    assert_eq!(scraper.call_count().await, 1);
    assert_eq!(provider.call_count().await, 4);
    assert_eq!(coordinator.cache().keys(), vec!["UALBERTA:CMPUT 174"]);

    // The second classification saw the cache and the previous exchange
    let requests = provider.get_requests().await;
    let second_classification = &requests[2].messages[0].content;
    assert!(second_classification.contains("Cached Lookups: UALBERTA:CMPUT 174"));
    assert!(second_classification.contains("Last Action: Called CourseAgent"));
    assert!(second_classification.contains("User: Tell me about CMPUT 174"));
    assert!(second_classification.contains("Assistant: first answer"));
}

#[tokio::test]
async fn test_unparseable_classification_falls_back_to_course_agent() {
    let provider = MockLlmProvider::new(vec![
        "Sure! I think this is about a course.".to_string(),
        "CMPUT 174 covers Python programming.".to_string(),
    ]);
    let scraper = MockScrapeGateway::new().with_page(CMPUT_174_URL, CMPUT_174_PAGE);
    let (mut coordinator, provider, scraper) =
        mock_coordinator(&test_config(), provider, scraper, true);

    let reply = coordinator.execute("What is CMPUT 174 about?").await;

    assert_eq!(reply, "CMPUT 174 covers Python programming.");
    assert_eq!(scraper.requested_urls().await, vec![CMPUT_174_URL]);
    let requests = provider.get_requests().await;
    assert!(requests[1].messages[0]
        .content
        .contains("User Question: What is CMPUT 174 about?"));
    assert_eq!(coordinator.agents().get("CourseAgent").unwrap().invocation_count, 1);
}

#[tokio::test]
async fn test_empty_classification_falls_back_to_course_agent() {
    let provider = MockLlmProvider::new(vec![
        String::new(),
        "CMPUT 174 is an introductory Python course.".to_string(),
    ]);
    let scraper = MockScrapeGateway::new().with_page(CMPUT_174_URL, CMPUT_174_PAGE);
    let (mut coordinator, provider, scraper) =
        mock_coordinator(&test_config(), provider, scraper, true);

    let reply = coordinator.execute("What is CMPUT 174 about?").await;

    assert_eq!(reply, "CMPUT 174 is an introductory Python course.");
    assert_eq!(scraper.requested_urls().await, vec![CMPUT_174_URL]);
    let requests = provider.get_requests().await;
    assert_eq!(requests.len(), 2);
    assert!(requests[1].messages[0]
        .content
        .contains("User Question: What is CMPUT 174 about?"));
    assert_eq!(coordinator.agents().get("CourseAgent").unwrap().invocation_count, 1);
}

#[tokio::test]
async fn test_course_scrape_error_is_reported_without_caching_or_answering() {
    let provider = MockLlmProvider::new(vec![
        decision("CourseAgent", json!({"course_code": "CMPUT 174", "university": "ualberta"})),
        "should never be used".to_string(),
    ]);
    let scraper = MockScrapeGateway::new().with_failure(
        CMPUT_174_URL,
        ScrapeError::Rejected {
            url: CMPUT_174_URL.to_string(),
            reason: "Page could not be rendered".to_string(),
        },
    );
    let (mut coordinator, provider, _scraper) =
        mock_coordinator(&test_config(), provider, scraper, false);

    let reply = coordinator.execute("Tell me about CMPUT 174").await;

    assert!(reply.starts_with("Error: Failed to fetch"));
    assert!(reply.contains("Page could not be rendered"));
    assert!(reply.ends_with("Please check the university key and course code."));
    assert!(coordinator.cache().is_empty());
    assert_eq!(provider.call_count().await, 1);
}

#[tokio::test]
async fn test_unknown_university_lists_catalogue_keys() {
    let provider = MockLlmProvider::single_response(decision(
        "CourseAgent",
        json!({"course_code": "CS 50", "university": "Harvard University"}),
    ));
    let (mut coordinator, provider, scraper) =
        mock_coordinator(&test_config(), provider, MockScrapeGateway::new(), false);

    let reply = coordinator.execute("What is CS 50 at Harvard?").await;

    assert!(reply.starts_with("Error: Unknown university 'Harvard University'"));
    assert!(reply.contains("ualberta"));
    assert_eq!(scraper.call_count().await, 0);
    assert_eq!(provider.call_count().await, 1);
}

#[tokio::test]
async fn test_professor_with_university_dispatches_without_clarification() {
    let provider = MockLlmProvider::new(vec![
        decision(
            "InstructorAgent",
            json!({"professor_name": "Richard Sutton", "university": "University of Alberta", "question": "Is he a good lecturer?"}),
        ),
        "Students rate Richard Sutton 4.5/5.".to_string(),
    ]);
    let scraper = MockScrapeGateway::new()
        .with_prefix(RMP_SEARCH_PREFIX, search_page(&[12345]))
        .with_page(
            rmp_profile_url(12345),
            profile_page("Richard Sutton", "University of Alberta"),
        );
    let (mut coordinator, provider, scraper) =
        mock_coordinator(&test_config(), provider, scraper, true);

    let reply = coordinator
        .execute("Tell me about Professor Richard Sutton at University of Alberta")
        .await;

    assert_eq!(reply, "Students rate Richard Sutton 4.5/5.");
    assert!(coordinator
        .cache()
        .contains(&cache_key("University of Alberta", "Richard Sutton")));

    let urls = scraper.requested_urls().await;
    assert_eq!(urls.len(), 2);
    assert!(urls[0].starts_with(RMP_SEARCH_PREFIX));
    assert!(urls[0].contains("Richard+Sutton"));
    assert_eq!(urls[1], rmp_profile_url(12345));

    let requests = provider.get_requests().await;
    let answer_prompt = &requests[1].messages[0].content;
    assert!(answer_prompt.contains("- Overall Rating: 4.5/5.0"));
    assert!(answer_prompt.contains("- Number of Ratings: 158"));
    assert!(answer_prompt.contains("USER QUESTION: Is he a good lecturer?"));
}

#[tokio::test]
async fn test_profile_of_another_university_is_skipped() {
    let provider = MockLlmProvider::new(vec![
        decision(
            "InstructorAgent",
            json!({"professor_name": "Richard Sutton", "university": "University of Alberta"}),
        ),
        "answer".to_string(),
    ]);
    let scraper = MockScrapeGateway::new()
        .with_prefix(RMP_SEARCH_PREFIX, search_page(&[1, 2]))
        .with_page(rmp_profile_url(1), profile_page("Richard Sutton", "Boston University"))
        .with_page(rmp_profile_url(2), profile_page("Richard Sutton", "University of Alberta"));
    let (mut coordinator, _provider, scraper) =
        mock_coordinator(&test_config(), provider, scraper, true);

    assert_eq!(coordinator.execute("Richard Sutton at Alberta?").await, "answer");

    let urls = scraper.requested_urls().await;
    assert_eq!(&urls[1..], &[rmp_profile_url(1), rmp_profile_url(2)]);
}

#[tokio::test]
async fn test_professor_without_university_asks_for_it_then_dispatches() {
    let provider = MockLlmProvider::new(vec![
        decision(
            "InstructorAgent",
            json!({"professor_name": "Mike Horowitz", "university": null, "question": "What are his ratings?"}),
        ),
        decision(
            "InstructorAgent",
            json!({"professor_name": null, "university": "Carnegie Mellon University", "question": "Carnegie Mellon"}),
        ),
        "Mike Horowitz is well liked.".to_string(),
    ]);
    let scraper = MockScrapeGateway::new()
        .with_prefix(RMP_SEARCH_PREFIX, search_page(&[777]))
        .with_page(
            rmp_profile_url(777),
            profile_page("Mike Horowitz", "Carnegie Mellon University"),
        );
    let (mut coordinator, provider, scraper) =
        mock_coordinator(&test_config(), provider, scraper, true);

    let clarification = coordinator.execute("What are Mike Horowitz's ratings?").await;

    assert!(clarification.contains("Mike Horowitz"));
    assert!(clarification.contains("Which university"));
    assert!(clarification.contains("For example"));
    assert_eq!(scraper.call_count().await, 0);
    assert_eq!(provider.call_count().await, 1);

    let reply = coordinator.execute("Carnegie Mellon").await;

    assert_eq!(reply, "Mike Horowitz is well liked.");
    let requests = provider.get_requests().await;
    assert_eq!(requests.len(), 3);
    assert!(requests[2].messages[0]
        .content
        .contains("USER QUESTION: What are his ratings?"));
    assert!(coordinator
        .cache()
        .contains(&cache_key("Carnegie Mellon University", "Mike Horowitz")));
}

#[tokio::test]
async fn test_missing_professor_reports_causes_and_is_not_cached() {
    let provider = MockLlmProvider::single_response(decision(
        "InstructorAgent",
        json!({"professor_name": "Nobody Real", "university": "University of Alberta"}),
    ));
    let scraper = MockScrapeGateway::new().with_prefix(RMP_SEARCH_PREFIX, search_page(&[]));
    let (mut coordinator, provider, _scraper) =
        mock_coordinator(&test_config(), provider, scraper, true);

    let reply = coordinator.execute("Who is Nobody Real at Alberta?").await;

    assert!(reply.starts_with(
        "I couldn't find information about Professor Nobody Real at University of Alberta"
    ));
    assert!(reply.contains("spelled differently"));
    assert!(reply.contains("ratemyprofessors.com/professor/"));
    assert!(coordinator.cache().is_empty());
    assert_eq!(provider.call_count().await, 1);
}

#[tokio::test]
async fn test_profile_url_skips_search() {
    let provider = MockLlmProvider::new(vec![
        decision(
            "InstructorAgent",
            json!({"profile_url": "https://www.ratemyprofessors.com/professor/4242"}),
        ),
        "Here is that profile.".to_string(),
    ]);
    let scraper = MockScrapeGateway::new().with_page(
        rmp_profile_url(4242),
        profile_page("Ada Lovelace", "University of Alberta"),
    );
    let (mut coordinator, _provider, scraper) =
        mock_coordinator(&test_config(), provider, scraper, true);

    let reply = coordinator
        .execute("https://www.ratemyprofessors.com/professor/4242")
        .await;

    assert_eq!(reply, "Here is that profile.");
    assert_eq!(scraper.requested_urls().await, vec![rmp_profile_url(4242)]);
    assert!(coordinator.cache().is_empty());
}

#[tokio::test]
async fn test_quota_exhausted_during_classification() {
    let provider = MockLlmProvider::with_error(LlmError::RateLimitExceeded(
        "429 RESOURCE_EXHAUSTED".to_string(),
    ));
    let (mut coordinator, _provider, scraper) =
        mock_coordinator(&test_config(), provider, MockScrapeGateway::new(), true);

    let reply = coordinator.execute("What is CMPUT 174?").await;

    assert_eq!(reply, QUOTA_EXHAUSTED_MESSAGE);
    assert_eq!(scraper.call_count().await, 0);
    assert_eq!(coordinator.history().len(), 2);
}

#[tokio::test]
async fn test_quota_exhausted_during_answer() {
    let provider = MockLlmProvider::from_results(vec![
        Ok(decision("CourseAgent", json!({"course_code": "CMPUT 174"}))),
        Err(LlmError::ApiError("429 quota exceeded".to_string())),
    ]);
    let scraper = MockScrapeGateway::new().with_page(CMPUT_174_URL, CMPUT_174_PAGE);
    let (mut coordinator, _provider, _scraper) =
        mock_coordinator(&test_config(), provider, scraper, false);

    let reply = coordinator.execute("CMPUT 174?").await;

    assert_eq!(reply, QUOTA_EXHAUSTED_MESSAGE);
}

#[tokio::test]
async fn test_instructor_agent_unregistered_without_scraper_key() {
    let provider = MockLlmProvider::single_response(decision(
        "InstructorAgent",
        json!({"professor_name": "Richard Sutton", "university": "University of Alberta"}),
    ));
    let (mut coordinator, _provider, scraper) =
        mock_coordinator(&test_config(), provider, MockScrapeGateway::new(), false);

    let reply = coordinator.execute("Richard Sutton at Alberta?").await;

    assert_eq!(
        reply,
        "I'm not sure how to help with that. Try asking about a specific course or professor."
    );
    assert_eq!(scraper.call_count().await, 0);
}

#[tokio::test]
async fn test_clear_history_drops_pending_slots() {
    let provider = MockLlmProvider::new(vec![
        decision("InstructorAgent", json!({"professor_name": "Mike Horowitz"})),
        decision("InstructorAgent", json!({"university": "Stanford University"})),
    ]);
    let (mut coordinator, _provider, scraper) =
        mock_coordinator(&test_config(), provider, MockScrapeGateway::new(), true);

    coordinator.execute("How is Mike Horowitz?").await;
    coordinator.clear_history();
    let reply = coordinator.execute("Stanford University").await;

    // The professor was forgotten, so only the university is known now
    assert!(reply.starts_with("Which professor at Stanford University"));
    assert_eq!(scraper.call_count().await, 0);
    assert_eq!(coordinator.history().len(), 2);
}

#[tokio::test]
async fn test_stats_track_exchanges_and_calls() {
    let provider = MockLlmProvider::new(vec![
        decision("none", json!({})),
        decision("CourseAgent", json!({"course_code": "CMPUT 174"})),
        "answer".to_string(),
    ]);
    let scraper = MockScrapeGateway::new().with_page(CMPUT_174_URL, CMPUT_174_PAGE);
    let (mut coordinator, _provider, _scraper) =
        mock_coordinator(&test_config(), provider, scraper, true);

    coordinator.execute("hello").await;
    coordinator.execute("CMPUT 174?").await;
    let stats = coordinator.stats();

    assert_eq!(stats.total_exchanges, 2);
    assert_eq!(stats.turns_stored, 4);
    assert_eq!(stats.cached_entries, 1);
    assert_eq!(stats.agent_calls[0].name, "CourseAgent");
    assert_eq!(stats.agent_calls[0].calls, 1);
    assert_eq!(stats.agent_calls[1].calls, 0);
}
