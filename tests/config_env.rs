use courier::{MailConfig, Mailer};
use pretty_assertions::assert_eq;

// Only test in this binary touching the process environment
#[test]
fn resolves_from_environment() {
    std::env::set_var("MAIL_SERVER", "smtp.example.org:465");
    std::env::set_var("MAIL_TLS", "true");
    std::env::set_var("MAIL_LOGIN", "bot@example.org");
    std::env::set_var("MAIL_PASSWORD", "secret");
    std::env::set_var("MAIL_TO", "a@example.org:b@example.org");

    let config = MailConfig::from_env().unwrap();
    assert_eq!(
        config,
        MailConfig::new("smtp.example.org:465", "bot@example.org")
            .tls(true)
            .password("secret")
            .to(vec!["a@example.org".to_owned(), "b@example.org".to_owned()])
    );

    let mailer = Mailer::from_env().unwrap();
    assert_eq!(mailer.config(), &config);

    std::env::remove_var("MAIL_SERVER");
    let err = MailConfig::from_env().unwrap_err();
    assert!(err.is_missing());
}
