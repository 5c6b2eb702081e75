use anyhow::anyhow;
use ip_proxy_checker::proxy::{InputParser, ParsedInput, ProxyType};
use ip_proxy_checker::session::{fetch_whois, Delivery, Session, TableKind};
use ip_proxy_checker::table::{CsvStyle, QualityRecord, StatusFilter, TableStats, WhoisRecord};
use ip_proxy_checker::{CheckError, LookupService, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Lookup service answering from fixed rules instead of the network
#[derive(Default)]
struct MockService {
    fail_lookups: bool,
    lookups: AtomicUsize,
    seen_proxies: Mutex<Vec<String>>,
}

impl MockService {
    fn failing() -> Self {
        Self {
            fail_lookups: true,
            ..Self::default()
        }
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl LookupService for MockService {
    async fn parse_input(&self, text: &str) -> Result<ParsedInput> {
        Ok(InputParser::parse(text, ProxyType::Http))
    }

    async fn check_whois(&self, ips: Vec<String>) -> Result<Vec<WhoisRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups {
            return Err(anyhow!("whois service unavailable"));
        }
        Ok(ips
            .into_iter()
            .map(|ip| {
                let mut record = WhoisRecord::success(ip);
                record.country = "Germany".to_string();
                record
            })
            .collect())
    }

    async fn check_quality(&self, proxies: Vec<String>, _api_key: String) -> Result<Vec<QualityRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups {
            return Err(anyhow!("quality service unavailable"));
        }
        self.seen_proxies.lock().unwrap().extend(proxies.iter().cloned());

        // authenticated proxies answer, the rest time out
        Ok(proxies
            .iter()
            .map(|proxy| {
                let parts: Vec<&str> = proxy.split(':').collect();
                if parts.len() == 4 {
                    let mut record = QualityRecord::live(parts[0], parts[1]);
                    record.country = "US".to_string();
                    record.vpn = true;
                    record
                } else {
                    QualityRecord::dead(parts[0], parts[1], "timeout")
                }
            })
            .collect())
    }
}

#[tokio::test]
async fn quality_check_end_to_end() {
    let service = MockService::default();
    let mut session = Session::new();

    let delivery = session
        .check_quality(&service, "1.1.1.1:8080:user:pass\n2.2.2.2:3128", "")
        .await;

    assert_eq!(delivery, Delivery::Applied(2));
    assert_eq!(
        *service.seen_proxies.lock().unwrap(),
        vec!["1.1.1.1:8080:user:pass", "2.2.2.2:3128"]
    );
    assert_eq!(
        session.quality.stats(),
        TableStats {
            total: 2,
            live: 1,
            dead: 1,
            live_rate: 50.0
        }
    );

    session.quality.set_status_filter(StatusFilter::Live);
    let csv = session.quality.export(CsvStyle::Quoted).unwrap().unwrap();
    let csv = String::from_utf8(csv).unwrap();
    assert_eq!(
        csv,
        "IP:Port,Status,Country,City,VPN,Proxy,ISP,Organization\n\
         1.1.1.1:8080,Live,US,N/A,Yes,No,N/A,N/A\n"
    );
}

#[tokio::test]
async fn empty_input_keeps_existing_records() {
    let service = MockService::default();
    let mut session = Session::new();

    session.check_whois(&service, "8.8.8.8\n9.9.9.9").await;
    assert_eq!(session.whois.records().len(), 2);
    assert_eq!(service.lookups(), 1);

    let delivery = session.check_whois(&service, "1.1.1.1:8080\n# only proxies").await;
    assert_eq!(delivery, Delivery::Failed);
    assert_eq!(service.lookups(), 1);
    assert_eq!(session.whois.records().len(), 2);
    assert!(!session.is_loading(TableKind::Whois));

    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].error, CheckError::NoIps);

    let delivery = session.check_quality(&service, "8.8.8.8", "").await;
    assert_eq!(delivery, Delivery::Failed);
    assert_eq!(session.take_notices()[0].error, CheckError::NoProxies);
}

#[tokio::test]
async fn collaborator_failure_clears_loading() {
    let service = MockService::failing();
    let mut session = Session::new();

    let delivery = session.check_whois(&service, "8.8.8.8").await;
    assert_eq!(delivery, Delivery::Failed);
    assert!(!session.is_loading(TableKind::Whois));
    assert!(session.whois.records().is_empty());

    let notices = session.take_notices();
    assert_eq!(
        notices[0].error,
        CheckError::Collaborator("whois service unavailable".to_string())
    );
}

#[tokio::test]
async fn stale_outcome_is_discarded() {
    let service = MockService::default();
    let mut session = Session::new();

    let first = session.begin(TableKind::Whois);
    let first_outcome = fetch_whois(&service, "1.1.1.1").await;
    let second = session.begin(TableKind::Whois);
    let second_outcome = fetch_whois(&service, "2.2.2.2\n3.3.3.3").await;

    assert_eq!(session.finish_whois(second, second_outcome), Delivery::Applied(2));
    assert_eq!(session.finish_whois(first, first_outcome), Delivery::Stale);

    let ips: Vec<&str> = session.whois.records().iter().map(|r| r.ip.as_str()).collect();
    assert_eq!(ips, vec!["2.2.2.2", "3.3.3.3"]);
    assert!(!session.is_loading(TableKind::Whois));
}

#[tokio::test]
async fn search_is_case_insensitive_across_fields() {
    let service = MockService::default();
    let mut session = Session::new();
    session.check_whois(&service, "8.8.8.8").await;

    for term in ["Germany", "germany", "GER", "many"] {
        session.whois.set_search(term);
        assert_eq!(session.whois.displayed().len(), 1, "term {}", term);
    }
    session.whois.set_search("france");
    assert!(session.whois.displayed().is_empty());
    assert_eq!(session.whois.stats().total, 1);
}
