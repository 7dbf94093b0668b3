use rusqlite::ffi;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use storefront_core::db::DbError;
use storefront_core::{
    Account, AccountCreator, Address, AddressCreator, CallContext, CategoryMembership,
    ContactCreator, ContactInfo, CreateFullError, CreateFullRequest, CreateStep, HashError,
    MembershipCreator, RepoError, RepoResult, ResourceManager, SecretHasher, TxHandle,
    UserAggregate, UserCreators, UserService, ValidationError,
};

type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Clone, Copy, Default, PartialEq, Eq)]
enum Begin {
    #[default]
    Open,
    NoHandle,
    Fail,
}

#[derive(Clone, Default)]
struct Script {
    begin: Begin,
    commit_error: Option<&'static str>,
    rollback_error: Option<&'static str>,
    account_error: Option<&'static str>,
    address_error: Option<&'static str>,
    contact_error: Option<&'static str>,
    membership_error: Option<(i64, &'static str)>,
    account_panic: bool,
    address_panic: bool,
    contact_panic: bool,
    membership_panic: bool,
}

fn storage_failure(message: &str) -> RepoError {
    RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(
        ffi::Error::new(ffi::SQLITE_IOERR),
        Some(message.to_string()),
    )))
}

struct MockTx {
    log: CallLog,
    script: Arc<Script>,
}

impl TxHandle for MockTx {
    fn commit(&mut self, _ctx: &CallContext) -> RepoResult<()> {
        self.log.lock().unwrap().push("commit".to_string());
        match self.script.commit_error {
            Some(message) => Err(storage_failure(message)),
            None => Ok(()),
        }
    }

    fn rollback(&mut self, _ctx: &CallContext) -> RepoResult<()> {
        self.log.lock().unwrap().push("rollback".to_string());
        match self.script.rollback_error {
            Some(message) => Err(storage_failure(message)),
            None => Ok(()),
        }
    }
}

struct MockManager {
    log: CallLog,
    script: Arc<Script>,
}

impl ResourceManager for MockManager {
    type Tx = MockTx;

    fn begin_tx(&self, _ctx: &CallContext) -> RepoResult<Option<MockTx>> {
        self.log.lock().unwrap().push("begin".to_string());
        match self.script.begin {
            Begin::Open => Ok(Some(MockTx {
                log: Arc::clone(&self.log),
                script: Arc::clone(&self.script),
            })),
            Begin::NoHandle => Ok(None),
            Begin::Fail => Err(storage_failure("connection refused")),
        }
    }
}

struct MockCreator {
    log: CallLog,
    script: Arc<Script>,
    seen_passwords: Arc<Mutex<Vec<String>>>,
}

impl AccountCreator<MockTx> for MockCreator {
    fn create_within_tx(
        &self,
        _ctx: &CallContext,
        _tx: &mut MockTx,
        mut account: Account,
    ) -> RepoResult<Account> {
        self.log.lock().unwrap().push("account".to_string());
        self.seen_passwords
            .lock()
            .unwrap()
            .push(account.password.clone());
        if self.script.account_panic {
            panic!("{}", String::from("account store exploded"));
        }
        if let Some(message) = self.script.account_error {
            return Err(RepoError::Conflict(message.to_string()));
        }
        account.id = 42;
        account.created_at = 1_000;
        account.updated_at = 1_000;
        Ok(account)
    }
}

impl AddressCreator<MockTx> for MockCreator {
    fn create_within_tx(
        &self,
        _ctx: &CallContext,
        _tx: &mut MockTx,
        mut address: Address,
    ) -> RepoResult<Address> {
        self.log.lock().unwrap().push("address".to_string());
        if self.script.address_panic {
            panic!("address geocoder crashed");
        }
        if let Some(message) = self.script.address_error {
            return Err(storage_failure(message));
        }
        address.id = 7;
        Ok(address)
    }
}

impl ContactCreator<MockTx> for MockCreator {
    fn create_within_tx(
        &self,
        _ctx: &CallContext,
        _tx: &mut MockTx,
        mut contact: ContactInfo,
    ) -> RepoResult<ContactInfo> {
        self.log.lock().unwrap().push("contact".to_string());
        if self.script.contact_panic {
            panic!("contact encoder crashed");
        }
        if let Some(message) = self.script.contact_error {
            return Err(storage_failure(message));
        }
        contact.id = 9;
        Ok(contact)
    }
}

impl MembershipCreator<MockTx> for MockCreator {
    fn create_within_tx(
        &self,
        _ctx: &CallContext,
        _tx: &mut MockTx,
        membership: CategoryMembership,
    ) -> RepoResult<CategoryMembership> {
        self.log
            .lock()
            .unwrap()
            .push(format!("membership:{}", membership.category_id));
        if self.script.membership_panic {
            panic!("nil pointer");
        }
        if let Some((category_id, message)) = self.script.membership_error {
            if category_id == membership.category_id {
                return Err(storage_failure(message));
            }
        }
        Ok(membership)
    }
}

struct PrefixHasher {
    log: CallLog,
}

impl SecretHasher for PrefixHasher {
    fn hash(&self, secret: &str) -> Result<String, HashError> {
        self.log.lock().unwrap().push("hash".to_string());
        Ok(format!("hashed:{}", secret.len()))
    }
}

struct FailingHasher;

impl SecretHasher for FailingHasher {
    fn hash(&self, _secret: &str) -> Result<String, HashError> {
        Err(HashError::Backend("kdf unavailable".to_string()))
    }
}

struct Harness {
    log: CallLog,
    seen_passwords: Arc<Mutex<Vec<String>>>,
    service: UserService<MockManager, PrefixHasher>,
}

impl Harness {
    fn new(script: Script) -> Self {
        let log: CallLog = Arc::default();
        let seen_passwords = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(script);
        let creator = || MockCreator {
            log: Arc::clone(&log),
            script: Arc::clone(&script),
            seen_passwords: Arc::clone(&seen_passwords),
        };
        let creators = UserCreators {
            accounts: Box::new(creator()),
            addresses: Box::new(creator()),
            contacts: Box::new(creator()),
            memberships: Box::new(creator()),
        };
        let manager = MockManager {
            log: Arc::clone(&log),
            script: Arc::clone(&script),
        };
        let hasher = PrefixHasher {
            log: Arc::clone(&log),
        };
        Self {
            service: UserService::new(manager, hasher, creators),
            log,
            seen_passwords,
        }
    }

    fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|entry| *entry == call).count()
    }

    fn create(&self, request: CreateFullRequest) -> Result<UserAggregate, CreateFullError> {
        self.service.create_full(&CallContext::background(), request)
    }
}

fn valid_request(category_ids: Vec<i64>) -> CreateFullRequest {
    CreateFullRequest::new(
        Account::new("alice", "a@x.com", "Secret123!"),
        Address::new("1 Main St", "Springfield", "12345", "US"),
        ContactInfo::new("Alice").with_email("alice@x.com"),
        category_ids,
    )
}

#[test]
fn valid_aggregate_commits_once_with_generated_ids() {
    let harness = Harness::new(Script::default());

    let created = harness.create(valid_request(vec![1])).unwrap();

    assert!(created.account.id > 0);
    assert!(created.address.id > 0);
    assert!(created.contact.id > 0);
    assert_eq!(created.address.user_id, Some(created.account.id));
    assert_eq!(created.contact.user_id, Some(created.account.id));
    assert_eq!(created.category_ids, vec![1]);
    assert_eq!(harness.count("commit"), 1);
    assert_eq!(harness.count("rollback"), 0);
    assert_eq!(
        harness.calls(),
        vec![
            "hash",
            "begin",
            "account",
            "address",
            "contact",
            "membership:1",
            "commit"
        ]
    );
}

#[test]
fn password_is_hashed_before_account_creation() {
    let harness = Harness::new(Script::default());

    let created = harness.create(valid_request(vec![1, 2])).unwrap();

    let seen = harness.seen_passwords.lock().unwrap().clone();
    assert_eq!(seen, vec!["hashed:10".to_string()]);
    assert_eq!(created.account.password, "hashed:10");
}

#[test]
fn memberships_are_created_in_request_order() {
    let harness = Harness::new(Script::default());

    let created = harness.create(valid_request(vec![3, 1, 2])).unwrap();

    assert_eq!(created.category_ids, vec![3, 1, 2]);
    let memberships: Vec<String> = harness
        .calls()
        .into_iter()
        .filter(|call| call.starts_with("membership:"))
        .collect();
    assert_eq!(memberships, vec!["membership:3", "membership:1", "membership:2"]);
}

fn assert_rejected_before_begin(request: CreateFullRequest, expected: &str) {
    let harness = Harness::new(Script::default());

    let err = harness.create(request).unwrap_err();

    assert!(matches!(err, CreateFullError::Validation(_)));
    assert_eq!(err.to_string(), expected);
    assert_eq!(harness.count("begin"), 0);
    assert_eq!(harness.count("hash"), 0);
}

#[test]
fn incomplete_aggregates_fail_before_begin() {
    let mut request = valid_request(vec![1]);
    request.account = None;
    assert_rejected_before_begin(request, "account is required");

    let mut request = valid_request(vec![1]);
    request.address = None;
    assert_rejected_before_begin(request, "address is required");

    let mut request = valid_request(vec![1]);
    request.contact = None;
    assert_rejected_before_begin(request, "contact is required");

    assert_rejected_before_begin(valid_request(Vec::new()), "at least one category is required");
}

#[test]
fn account_field_rules_fail_before_begin() {
    let harness = Harness::new(Script::default());
    let mut request = valid_request(vec![1]);
    request.account = Some(Account::new("alice", "a@x.com", "weakpassword"));

    let err = harness.create(request).unwrap_err();

    assert!(matches!(
        err,
        CreateFullError::Validation(ValidationError::PasswordComplexity)
    ));
    assert!(harness.calls().is_empty());
}

#[test]
fn hash_failure_never_opens_transaction() {
    let log: CallLog = Arc::default();
    let script = Arc::new(Script::default());
    let creator = || MockCreator {
        log: Arc::clone(&log),
        script: Arc::clone(&script),
        seen_passwords: Arc::default(),
    };
    let service = UserService::new(
        MockManager {
            log: Arc::clone(&log),
            script: Arc::clone(&script),
        },
        FailingHasher,
        UserCreators {
            accounts: Box::new(creator()),
            addresses: Box::new(creator()),
            contacts: Box::new(creator()),
            memberships: Box::new(creator()),
        },
    );

    let err = service
        .create_full(&CallContext::background(), valid_request(vec![1]))
        .unwrap_err();

    assert!(matches!(err, CreateFullError::Hash(_)));
    assert!(err.to_string().contains("kdf unavailable"));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn begin_failure_is_wrapped() {
    let harness = Harness::new(Script {
        begin: Begin::Fail,
        ..Script::default()
    });

    let err = harness.create(valid_request(vec![1])).unwrap_err();

    assert!(matches!(err, CreateFullError::BeginTransaction(_)));
    assert_eq!(
        err.to_string(),
        "failed to start transaction: connection refused"
    );
    assert_eq!(harness.count("account"), 0);
    assert_eq!(harness.count("rollback"), 0);
}

#[test]
fn missing_handle_is_invalid_transaction() {
    let harness = Harness::new(Script {
        begin: Begin::NoHandle,
        ..Script::default()
    });

    let err = harness.create(valid_request(vec![1])).unwrap_err();

    assert!(matches!(err, CreateFullError::InvalidTransaction));
    assert!(err.to_string().contains("invalid transaction"));
    assert_eq!(harness.count("account"), 0);
}

#[test]
fn account_creator_failure_rolls_back_once() {
    let harness = Harness::new(Script {
        account_error: Some("duplicate email"),
        ..Script::default()
    });

    let err = harness.create(valid_request(vec![1])).unwrap_err();

    assert!(err.to_string().contains("duplicate email"));
    assert!(matches!(
        err,
        CreateFullError::Persistence {
            step: CreateStep::Account,
            ..
        }
    ));
    assert_eq!(harness.count("rollback"), 1);
    assert_eq!(harness.count("commit"), 0);
    assert_eq!(harness.count("address"), 0);
}

#[test]
fn creator_failure_with_failed_rollback_reports_both() {
    let harness = Harness::new(Script {
        contact_error: Some("contacts table locked"),
        rollback_error: Some("connection lost"),
        ..Script::default()
    });

    let err = harness.create(valid_request(vec![1])).unwrap_err();

    let message = err.to_string();
    assert!(message.contains("contacts table locked"));
    assert!(message.contains("rollback error: connection lost"));
    assert!(matches!(
        err.operation_error(),
        CreateFullError::Persistence {
            step: CreateStep::Contact,
            ..
        }
    ));
    assert_eq!(harness.count("rollback"), 1);
    assert_eq!(harness.count("commit"), 0);
}

#[test]
fn address_creator_failure_stops_before_contact() {
    let harness = Harness::new(Script {
        address_error: Some("address insert failed"),
        ..Script::default()
    });

    let err = harness.create(valid_request(vec![1])).unwrap_err();

    assert!(err.to_string().contains("failed to create address"));
    assert_eq!(harness.count("contact"), 0);
    assert_eq!(harness.count("rollback"), 1);
}

#[test]
fn membership_failure_aborts_remaining_memberships() {
    let harness = Harness::new(Script {
        membership_error: Some((2, "unknown category")),
        ..Script::default()
    });

    let err = harness.create(valid_request(vec![1, 2, 3])).unwrap_err();

    assert!(err.to_string().contains("membership for category 2"));
    assert!(err.to_string().contains("unknown category"));
    let calls = harness.calls();
    assert!(calls.contains(&"membership:1".to_string()));
    assert!(calls.contains(&"membership:2".to_string()));
    assert!(!calls.contains(&"membership:3".to_string()));
    assert_eq!(harness.count("rollback"), 1);
    assert_eq!(harness.count("commit"), 0);
}

#[test]
fn non_positive_category_is_rejected_inside_transaction() {
    let harness = Harness::new(Script::default());

    let err = harness.create(valid_request(vec![1, 0])).unwrap_err();

    assert!(matches!(
        err,
        CreateFullError::InvalidMembership { category_id: 0, .. }
    ));
    assert!(err.to_string().contains("category_id must be a positive integer"));
    assert!(!harness.calls().contains(&"membership:0".to_string()));
    assert_eq!(harness.count("rollback"), 1);
    assert_eq!(harness.count("commit"), 0);
}

#[test]
fn address_is_revalidated_after_owner_assignment() {
    let harness = Harness::new(Script::default());
    let mut request = valid_request(vec![1]);
    request.address = Some(Address::new("", "Springfield", "12345", "US"));

    let err = harness.create(request).unwrap_err();

    assert_eq!(err.to_string(), "address invalid: street is required");
    assert_eq!(harness.count("account"), 1);
    assert_eq!(harness.count("address"), 0);
    assert_eq!(harness.count("rollback"), 1);
}

#[test]
fn contact_is_revalidated_after_owner_assignment() {
    let harness = Harness::new(Script::default());
    let mut request = valid_request(vec![1]);
    request.contact = Some(ContactInfo::new("Alice"));

    let err = harness.create(request).unwrap_err();

    assert_eq!(err.to_string(), "contact invalid: phone or email is required");
    assert_eq!(harness.count("address"), 0);
    assert_eq!(harness.count("rollback"), 1);
}

#[test]
fn commit_failure_with_successful_rollback_reports_commit_only() {
    let harness = Harness::new(Script {
        commit_error: Some("disk full"),
        ..Script::default()
    });

    let err = harness.create(valid_request(vec![1])).unwrap_err();

    let message = err.to_string();
    assert!(message.contains("disk full"));
    assert!(!message.contains("rollback error"));
    assert!(matches!(err, CreateFullError::Commit(_)));
    assert_eq!(harness.count("commit"), 1);
    assert_eq!(harness.count("rollback"), 1);
    assert_eq!(harness.calls().last().map(String::as_str), Some("rollback"));
}

#[test]
fn commit_failure_with_failed_rollback_reports_both() {
    let harness = Harness::new(Script {
        commit_error: Some("disk full"),
        rollback_error: Some("io error"),
        ..Script::default()
    });

    let err = harness.create(valid_request(vec![1])).unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed to commit transaction: disk full; rollback error: io error"
    );
    assert!(matches!(err.operation_error(), CreateFullError::Commit(_)));
    assert!(err.rollback_error().is_some());
}

#[test]
fn membership_panic_rolls_back_before_propagating() {
    let harness = Harness::new(Script {
        membership_panic: true,
        ..Script::default()
    });

    let outcome = catch_unwind(AssertUnwindSafe(|| harness.create(valid_request(vec![1]))));

    let payload = outcome.expect_err("panic must reach the caller");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"nil pointer"));
    assert_eq!(harness.count("rollback"), 1);
    assert_eq!(harness.count("commit"), 0);
    assert_eq!(harness.calls().last().map(String::as_str), Some("rollback"));
}

#[test]
fn account_panic_keeps_string_payload() {
    let harness = Harness::new(Script {
        account_panic: true,
        ..Script::default()
    });

    let outcome = catch_unwind(AssertUnwindSafe(|| harness.create(valid_request(vec![1]))));

    let payload = outcome.expect_err("panic must reach the caller");
    assert_eq!(
        payload.downcast_ref::<String>().map(String::as_str),
        Some("account store exploded")
    );
    assert_eq!(harness.count("rollback"), 1);
}

#[test]
fn address_and_contact_panics_roll_back_before_propagating() {
    let cases = [
        (
            Script {
                address_panic: true,
                ..Script::default()
            },
            "address geocoder crashed",
            "address",
        ),
        (
            Script {
                contact_panic: true,
                ..Script::default()
            },
            "contact encoder crashed",
            "contact",
        ),
    ];

    for (script, message, step) in cases {
        let harness = Harness::new(script);

        let outcome = catch_unwind(AssertUnwindSafe(|| harness.create(valid_request(vec![1]))));

        let payload = outcome.expect_err("panic must reach the caller");
        assert_eq!(payload.downcast_ref::<&str>(), Some(&message));
        assert_eq!(harness.count("rollback"), 1);
        assert_eq!(harness.count("commit"), 0);
        let calls = harness.calls();
        assert_eq!(calls.iter().rev().nth(1).map(String::as_str), Some(step));
        assert_eq!(calls.last().map(String::as_str), Some("rollback"));
        assert!(!calls.iter().any(|call| call.starts_with("membership:")));
    }
}
