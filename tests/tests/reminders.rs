//! Daily reminder scan end to end.

use digest_core::{limits::REMINDER_LOG_KIND, EmailPreference, RequirementStatus};
use integration_tests::fixtures::{admin, email_for, member, platform_superadmin, requirement, today};
use integration_tests::setup::TestContext;

#[tokio::test]
async fn test_due_in_seven_included_eight_excluded() {
    let ctx = TestContext::new();
    ctx.store.add_requirement(requirement("r7", "co-1", 7));
    ctx.store.add_requirement(requirement("r8", "co-1", 8));
    ctx.store.add_user(admin("admin-1", "co-1"));

    let report = ctx.reminders.run(today()).await.unwrap();

    assert_eq!(report.qualifying_requirements, 1);
    assert_eq!(report.sent, 1);
    let email = &ctx.mailer.sent_to(&email_for("admin-1"))[0];
    assert!(email.html.contains("Requirement r7"));
    assert!(email.html.contains("due in 7 days"));
    assert!(!email.html.contains("Requirement r8"));
}

#[tokio::test]
async fn test_overdue_cadence() {
    let ctx = TestContext::new();
    ctx.store.add_requirement(requirement("late-3", "co-1", -3));
    ctx.store.add_requirement(requirement("late-10", "co-1", -10));
    ctx.store.add_requirement(requirement("late-14", "co-1", -14));
    ctx.store.add_user(admin("admin-1", "co-1"));

    let report = ctx.reminders.run(today()).await.unwrap();

    assert_eq!(report.qualifying_requirements, 2);
    let email = &ctx.mailer.sent()[0];
    assert!(email.html.contains("Requirement late-3"));
    assert!(email.html.contains("Requirement late-14"));
    assert!(!email.html.contains("Requirement late-10"));
    assert!(email.subject.contains("2 overdue"));
}

#[tokio::test]
async fn test_completed_requirements_are_ignored() {
    let ctx = TestContext::new();
    let mut done = requirement("done", "co-1", 1);
    done.status = RequirementStatus::Completed;
    ctx.store.add_requirement(done);
    ctx.store.add_user(admin("admin-1", "co-1"));

    let report = ctx.reminders.run(today()).await.unwrap();

    assert_eq!(report.qualifying_requirements, 0);
    assert_eq!(ctx.mailer.sent_count(), 0);
}

#[tokio::test]
async fn test_recipients_by_role_and_company() {
    let ctx = TestContext::new();
    ctx.store.add_requirement(requirement("a", "co-1", 3));
    ctx.store.add_requirement(requirement("b", "co-2", 14));
    ctx.store.add_user(admin("admin-1", "co-1"));
    ctx.store.add_user(member("member-1", "co-1"));
    ctx.store.add_user(platform_superadmin("root"));

    let report = ctx.reminders.run(today()).await.unwrap();

    assert_eq!(report.recipients, 2);
    assert!(ctx.mailer.sent_to(&email_for("member-1")).is_empty());

    let admin_mail = &ctx.mailer.sent_to(&email_for("admin-1"))[0];
    assert!(admin_mail.html.contains("Requirement a"));
    assert!(!admin_mail.html.contains("Requirement b"));

    // one digest spanning both companies
    let root_mail = ctx.mailer.sent_to(&email_for("root"));
    assert_eq!(root_mail.len(), 1);
    assert!(root_mail[0].html.contains("Requirement a"));
    assert!(root_mail[0].html.contains("Requirement b"));
}

#[tokio::test]
async fn test_same_day_rerun_is_idempotent() {
    let ctx = TestContext::new();
    ctx.store.add_requirement(requirement("r1", "co-1", 1));
    ctx.store.add_user(admin("admin-1", "co-1"));

    ctx.reminders.run(today()).await.unwrap();
    let second = ctx.reminders.run(today()).await.unwrap();

    assert_eq!(second.sent, 0);
    assert_eq!(second.skipped_already_sent, 1);
    assert_eq!(ctx.mailer.sent_count(), 1);
    assert_eq!(
        ctx.store.log_entries(),
        vec![("admin-1".to_string(), today(), REMINDER_LOG_KIND.to_string())]
    );
}

#[tokio::test]
async fn test_failed_send_writes_no_log_and_retries() {
    let ctx = TestContext::new();
    ctx.store.add_requirement(requirement("r1", "co-1", 1));
    ctx.store.add_user(admin("admin-1", "co-1"));

    ctx.mailer.set_should_fail(true);
    let failed = ctx.reminders.run(today()).await.unwrap();
    assert_eq!(failed.failed, 1);
    assert!(ctx.store.log_entries().is_empty());
    assert!(ctx.store.in_app_notifications().is_empty());

    ctx.mailer.set_should_fail(false);
    let retry = ctx.reminders.run(today()).await.unwrap();
    assert_eq!(retry.sent, 1);
    assert_eq!(ctx.store.log_entries().len(), 1);
}

#[tokio::test]
async fn test_in_app_notifications_written_per_requirement() {
    let ctx = TestContext::new();
    ctx.store.add_requirement(requirement("r1", "co-1", 1));
    ctx.store.add_requirement(requirement("r2", "co-1", -2));
    ctx.store.add_user(admin("admin-1", "co-1"));

    ctx.reminders.run(today()).await.unwrap();

    let notes = ctx.store.in_app_notifications();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|n| n.user_id == "admin-1"));
    assert!(notes.iter().any(|n| n.requirement_id == "r2" && n.title.contains("overdue")));
}

#[tokio::test]
async fn test_reminder_opt_out_is_honored() {
    let ctx = TestContext::new();
    ctx.store.add_requirement(requirement("r1", "co-1", 3));
    ctx.store.add_user(admin("admin-1", "co-1"));
    let mut pref = EmailPreference::subscribed("admin-1");
    pref.unsubscribe_reminders = true;
    ctx.store.set_preference(pref);

    let report = ctx.reminders.run(today()).await.unwrap();

    assert_eq!(report.opted_out, 1);
    assert_eq!(ctx.mailer.sent_count(), 0);
    assert!(ctx.store.log_entries().iter().all(|(_, _, kind)| kind != REMINDER_LOG_KIND));
}

#[tokio::test]
async fn test_opted_out_user_still_gets_in_app_reminders_once() {
    let ctx = TestContext::new();
    ctx.store.add_requirement(requirement("r1", "co-1", 3));
    ctx.store.add_requirement(requirement("r2", "co-1", -1));
    ctx.store.add_user(admin("admin-1", "co-1"));
    let mut pref = EmailPreference::subscribed("admin-1");
    pref.unsubscribe_all = true;
    ctx.store.set_preference(pref);

    ctx.reminders.run(today()).await.unwrap();
    ctx.reminders.run(today()).await.unwrap();

    assert_eq!(ctx.mailer.sent_count(), 0);
    let notes = ctx.store.in_app_notifications();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|n| n.user_id == "admin-1"));
}
