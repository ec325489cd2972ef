/*
 * vPEC certified mail agent
 *
 * Copyright (C) 2003 - viridIT SAS
 * Licensed under the Elastic License 2.0
 *
 * You should have received a copy of the Elastic License 2.0 along with
 * this program. If not, see https://www.elastic.co/licensing/elastic-license.
 *
 */

//! End-to-end scenarios driving the three role handlers with in-memory
//! collaborators and on-the-fly credentials.

use std::sync::{Arc, Mutex};

use vpec_common::api::{
    DeliveryHop, MemoryStore, MessageStore, ProviderHop, SinkError, StoreError, StoredMessage, Uid,
};
use vpec_common::pec::{classify, PecType};
use vpec_common::registry::{Authority, MemoryAuthorityRegistry};
use vpec_common::{Envelope, Mailbox};
use vpec_mail_parser::build;
use vpec_mail_parser::mail::headers::Header;
use vpec_mail_parser::mime::{Mime, Part};
use vpec_mail_parser::Mail;
use vpec_pipeline::{ApOutcome, Core, DpOutcome, ProcessError, RpOutcome};
use vpec_smime::testing::self_signed_credentials;
use vpec_smime::{verify_signed, Signer, SmimeCertificate, SmimePrivateKey};

#[derive(Default)]
struct RecordingProviderHop {
    sent: Mutex<Vec<(String, Vec<Mailbox>, Vec<u8>)>>,
}

#[async_trait::async_trait]
impl ProviderHop for RecordingProviderHop {
    async fn send(
        &self,
        authority: &Authority,
        _reverse_path: &Mailbox,
        forward_paths: &[Mailbox],
        message: &[u8],
    ) -> Result<(), SinkError> {
        self.sent.lock().unwrap().push((
            authority.name.clone(),
            forward_paths.to_vec(),
            message.to_vec(),
        ));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingDeliveryHop {
    received: Mutex<Vec<Vec<u8>>>,
}

#[async_trait::async_trait]
impl DeliveryHop for RecordingDeliveryHop {
    async fn receive(&self, message: &[u8]) -> Result<(), SinkError> {
        self.received.lock().unwrap().push(message.to_vec());
        Ok(())
    }
}

/// A store failing every append to one specific mailbox.
struct FlakyStore {
    inner: MemoryStore,
    fail_for: String,
}

#[async_trait::async_trait]
impl MessageStore for FlakyStore {
    async fn add_message(&self, mailbox: &Mailbox, message: &[u8]) -> Result<Uid, StoreError> {
        if mailbox.to_string().eq_ignore_ascii_case(&self.fail_for) {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner.add_message(mailbox, message).await
    }

    async fn get_messages(&self, mailbox: &Mailbox) -> Result<Vec<StoredMessage>, StoreError> {
        self.inner.get_messages(mailbox).await
    }

    async fn delete(&self, mailbox: &Mailbox, uid: Uid) -> Result<(), StoreError> {
        self.inner.delete(mailbox, uid).await
    }
}

struct Provider {
    core: Arc<Core>,
    certificate: SmimeCertificate,
    key: SmimePrivateKey,
    store: Arc<MemoryStore>,
    provider_hop: Arc<RecordingProviderHop>,
    delivery_hop: Arc<RecordingDeliveryHop>,
}

impl Provider {
    fn signer(&self) -> Signer {
        Signer::new(
            &self.certificate,
            &self.key,
            self.core.domain().clone(),
        )
        .unwrap()
    }
}

fn authority_for(domain: &str, certificate: &SmimeCertificate) -> Authority {
    Authority {
        name: format!("{domain} PEC S.p.A."),
        domain: domain.parse().unwrap(),
        smtp_addr: format!("smtp.{domain}:25"),
        notification_address: format!("ricevute@{domain}").parse().unwrap(),
        provider_cert_hashes: [certificate.sha1_fingerprint().unwrap()].into(),
    }
}

fn provider(domain: &str, authorities: Vec<Authority>) -> Provider {
    provider_with_store(domain, authorities, Arc::new(MemoryStore::new()), None)
}

fn provider_with_store(
    domain: &str,
    authorities: Vec<Authority>,
    store: Arc<MemoryStore>,
    failing_mailbox: Option<&str>,
) -> Provider {
    let (certificate, key) = self_signed_credentials(domain);
    let signer = Signer::new(&certificate, &key, domain.parse().unwrap()).unwrap();

    let provider_hop = Arc::new(RecordingProviderHop::default());
    let delivery_hop = Arc::new(RecordingDeliveryHop::default());

    let effective_store: Arc<dyn MessageStore> = match failing_mailbox {
        Some(mailbox) => Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_for: mailbox.to_string(),
        }),
        None => store.clone(),
    };

    let core = Core::new(
        signer,
        format!("{domain} PEC S.p.A."),
        time::UtcOffset::from_hms(1, 0, 0).unwrap(),
        Arc::new(MemoryAuthorityRegistry::new(authorities)),
        effective_store,
        provider_hop.clone(),
        delivery_hop.clone(),
    );

    Provider {
        core,
        certificate,
        key,
        store,
        provider_hop,
        delivery_hop,
    }
}

fn mailbox(s: &str) -> Mailbox {
    s.parse().unwrap()
}

fn envelope(from: &str, to: &[&str]) -> Envelope {
    Envelope::new(mailbox(from), to.iter().map(|s| mailbox(s)).collect())
}

fn parse(bytes: &[u8]) -> Mail {
    Mail::try_from(bytes).unwrap()
}

fn has_embedded_message(bytes: &[u8]) -> bool {
    let mut mail = parse(bytes);
    mail.find_part(|part: &Mime| matches!(part.part, Part::Message(_)))
        .unwrap()
        .is_some()
}

const SUBMISSION: &str = "Received: from client.a.it by smtp.a.it\r\n\
    From: alice@a.it\r\n\
    To: bob@b.it\r\n\
    Subject: Test\r\n\
    Message-ID: <m1@a.it>\r\n\
    Date: Mon, 06 Nov 2023 10:21:13 +0100\r\n\
    \r\n\
    Ciao Bob,\r\n\
    a presto.\r\n";

async fn accepted_transport(pa: &Provider, envelope_to: &[&str], submission: &str) -> Vec<u8> {
    let ApOutcome::Accepted { transport, .. } = pa
        .core
        .access_point()
        .handle(&envelope("alice@a.it", envelope_to), submission.as_bytes())
        .await
        .unwrap()
    else {
        panic!("submission should have been accepted");
    };
    transport.bytes
}

/// S1: acceptance happy path.
#[tokio::test]
async fn acceptance_happy_path() {
    let pb = provider("b.it", vec![]);
    let pa = provider("a.it", vec![authority_for("b.it", &pb.certificate)]);

    let outcome = pa
        .core
        .access_point()
        .handle(&envelope("alice@a.it", &["bob@b.it"]), SUBMISSION.as_bytes())
        .await
        .unwrap();

    let ApOutcome::Accepted {
        receipt,
        transport,
        forwards,
    } = outcome
    else {
        panic!("submission should have been accepted");
    };

    // the acceptance receipt.
    let receipt_mail = parse(&receipt.bytes);
    assert_eq!(classify(&receipt_mail).pec_type, PecType::AcceptanceReceipt);
    assert_eq!(
        receipt_mail.get_header_value("Subject"),
        Some("ACCETTAZIONE: Test")
    );
    assert_eq!(receipt_mail.get_header_value("To"), Some("alice@a.it"));
    assert_eq!(
        receipt_mail.get_header_value("From"),
        Some("posta-certificata@a.it")
    );
    assert_eq!(
        receipt_mail.get_header_value("X-Riferimento-Message-ID"),
        Some("<m1@a.it>")
    );

    // the receipt reached the sender's mailbox.
    assert_eq!(
        pa.store
            .get_messages(&mailbox("alice@a.it"))
            .await
            .unwrap()
            .len(),
        1
    );

    // the transport envelope.
    let transport_mail = parse(&transport.bytes);
    assert_eq!(classify(&transport_mail).pec_type, PecType::CertifiedEmail);
    assert_eq!(
        transport_mail.get_header_value("Subject"),
        Some("POSTA CERTIFICATA: Test")
    );
    assert_eq!(
        transport_mail.get_header_value("Message-ID"),
        Some("<m1@a.it>")
    );
    assert!(transport_mail
        .get_header_value("From")
        .unwrap()
        .contains("posta-certificata@a.it"));
    assert!(has_embedded_message(&transport.bytes));

    // forwarded to b.it's provider.
    assert_eq!(forwards.len(), 1);
    assert!(forwards[0].result.is_ok());
    let sent = pa.provider_hop.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "b.it PEC S.p.A.");
    assert_eq!(sent[0].1, vec![mailbox("bob@b.it")]);
}

/// P2: every signed artifact verifies against the emitting signer.
#[tokio::test]
async fn artifacts_verify_against_the_signer() {
    let pa = provider("a.it", vec![]);

    let ApOutcome::Accepted {
        receipt, transport, ..
    } = pa
        .core
        .access_point()
        .handle(&envelope("alice@a.it", &["bob@b.it"]), SUBMISSION.as_bytes())
        .await
        .unwrap()
    else {
        panic!("submission should have been accepted");
    };

    for artifact in [&receipt.bytes, &transport.bytes] {
        let mut mail = parse(artifact);
        let verified = verify_signed(&mut mail).unwrap();
        assert_eq!(
            verified.signer_fingerprint,
            pa.certificate.sha1_fingerprint().unwrap()
        );
    }
}

/// S2: a Bcc header refuses the submission.
#[tokio::test]
async fn bcc_is_refused() {
    let pa = provider("a.it", vec![]);

    let submission = SUBMISSION.replace("Subject: Test\r\n", "Subject: Test\r\nBcc: eve@e.it\r\n");
    let outcome = pa
        .core
        .access_point()
        .handle(&envelope("alice@a.it", &["bob@b.it"]), submission.as_bytes())
        .await
        .unwrap();

    let ApOutcome::Rejected { receipt } = outcome else {
        panic!("submission should have been refused");
    };

    let receipt_mail = parse(&receipt.bytes);
    assert_eq!(
        classify(&receipt_mail).pec_type,
        PecType::NonAcceptanceReceipt
    );
    assert_eq!(
        receipt_mail.get_header_value("Subject"),
        Some("AVVISO DI NON ACCETTAZIONE: Test")
    );
    assert!(String::from_utf8_lossy(&receipt.bytes).contains("Bcc"));

    // nothing was forwarded.
    assert!(pa.provider_hop.sent.lock().unwrap().is_empty());
}

/// S3: a forward-path not listed in To/Cc refuses the submission.
#[tokio::test]
async fn forward_path_mismatch_is_refused() {
    let pa = provider("a.it", vec![]);

    let outcome = pa
        .core
        .access_point()
        .handle(
            &envelope("alice@a.it", &["carol@c.it"]),
            SUBMISSION.as_bytes(),
        )
        .await
        .unwrap();

    let ApOutcome::Rejected { receipt } = outcome else {
        panic!("submission should have been refused");
    };

    let body = String::from_utf8_lossy(&receipt.bytes).to_string();
    assert!(body.contains("carol@c.it"));
    assert!(body.contains("'To' or 'Cc'"));
}

/// A submission with PEC markers its values do not back up is not PEC.
#[tokio::test]
async fn spoofed_pec_markers_are_rejected() {
    let pa = provider("a.it", vec![]);

    let submission =
        SUBMISSION.replace("Subject: Test\r\n", "Subject: Test\r\nX-Trasporto: banana\r\n");
    let result = pa
        .core
        .access_point()
        .handle(&envelope("alice@a.it", &["bob@b.it"]), submission.as_bytes())
        .await;

    assert!(matches!(result, Err(ProcessError::NotPec)));
}

/// Transport envelopes are acknowledged and forwarded by the reception
/// point; the receipt leaves before the envelope.
#[tokio::test]
async fn reception_point_takes_in_charge() {
    let pa = provider("a.it", vec![]);
    let pb = provider("b.it", vec![authority_for("a.it", &pa.certificate)]);

    let transport = accepted_transport(&pa, &["bob@b.it"], SUBMISSION).await;

    let outcome = pb
        .core
        .reception_point()
        .handle(
            &envelope("posta-certificata@a.it", &["bob@b.it"]),
            &transport,
        )
        .await
        .unwrap();

    let RpOutcome::TakenInCharge { receipt } = outcome else {
        panic!("envelope should have been taken in charge");
    };

    // the taking-charge receipt goes back to a.it's notification address.
    let receipt_mail = parse(&receipt.bytes);
    assert_eq!(
        classify(&receipt_mail).pec_type,
        PecType::TakingChargeReceipt
    );
    assert_eq!(
        receipt_mail.get_header_value("X-Riferimento-Message-ID"),
        Some("<m1@a.it>")
    );
    let sent = pb.provider_hop.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, vec![mailbox("ricevute@a.it")]);

    // the envelope itself reached the delivery point unchanged.
    let received = pb.delivery_hop.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], transport);
}

/// An envelope signed by an unknown certificate becomes an anomaly.
#[tokio::test]
async fn untrusted_signer_becomes_anomaly() {
    let pa = provider("a.it", vec![]);
    // pb does not know a.it's certificate.
    let pb = provider("b.it", vec![]);

    let transport = accepted_transport(&pa, &["bob@b.it"], SUBMISSION).await;

    let outcome = pb
        .core
        .reception_point()
        .handle(
            &envelope("posta-certificata@a.it", &["bob@b.it"]),
            &transport,
        )
        .await
        .unwrap();

    let RpOutcome::Anomaly { envelope, reason } = outcome else {
        panic!("envelope should have been wrapped into an anomaly");
    };
    assert!(reason.contains("gestore"), "unexpected reason: {reason}");

    let anomaly_mail = parse(&envelope.bytes);
    assert_eq!(classify(&anomaly_mail).pec_type, PecType::AnomalyEnvelope);
    assert!(anomaly_mail
        .get_header_value("Subject")
        .unwrap()
        .starts_with("ANOMALIA MESSAGGIO:"));

    // the anomaly went to the delivery point.
    assert_eq!(pb.delivery_hop.received.lock().unwrap().len(), 1);
}

fn mismatched_receipt(signer: &Signer) -> Vec<u8> {
    let certification = vpec_daticert::DatiCert::parse(
        r#"<postacert tipo="avvenuta-consegna" errore="nessuno">
            <intestazione>
                <mittente>alice@a.it</mittente>
                <destinatari tipo="certificato">bob@b.it</destinatari>
                <risposte>alice@a.it</risposte>
                <oggetto>Test</oggetto>
            </intestazione>
            <dati>
                <gestore-emittente>a.it PEC S.p.A.</gestore-emittente>
                <data zona="+0100"><giorno>06/11/2023</giorno><ora>10:21:13</ora></data>
                <identificativo>opec1</identificativo>
                <msgid>&lt;m1@a.it&gt;</msgid>
            </dati>
        </postacert>"#,
    )
    .unwrap();

    let payload = build::mixed(vec![
        build::text_part("Ricevuta di accettazione\r\n"),
        build::base64_attachment(
            "application/xml",
            "daticert.xml",
            build::Disposition::Inline,
            &certification.to_xml().unwrap(),
        ),
    ]);
    let headers = vec![
        Header::new("Date", "Mon, 06 Nov 2023 10:21:13 +0100"),
        Header::new("Subject", "ACCETTAZIONE: Test"),
        Header::new("From", "posta-certificata@a.it"),
        Header::new("To", "alice@a.it"),
        Header::new("Message-ID", "<r1@a.it>"),
        Header::new("X-Riferimento-Message-ID", "<m1@a.it>"),
        Header::new("X-Ricevuta", "accettazione"),
    ];

    vpec_smime::seal(signer, &headers, &payload).unwrap()
}

/// S6: header/XML disagreement is a classification failure, even from a
/// certified provider.
#[tokio::test]
async fn classification_mismatch_becomes_anomaly() {
    let pa = provider("a.it", vec![]);
    let pb = provider("b.it", vec![authority_for("a.it", &pa.certificate)]);

    let receipt = mismatched_receipt(&pa.signer());

    let outcome = pb
        .core
        .reception_point()
        .handle(&envelope("posta-certificata@a.it", &["alice@a.it"]), &receipt)
        .await
        .unwrap();

    let RpOutcome::Anomaly { reason, .. } = outcome else {
        panic!("mismatched receipt should have been wrapped into an anomaly");
    };
    assert!(
        reason.contains("classificazione incoerente"),
        "unexpected reason: {reason}"
    );
}

/// A coherent receipt from a certified provider passes through unchanged.
#[tokio::test]
async fn valid_receipt_is_forwarded_unchanged() {
    let pa = provider("a.it", vec![]);
    let pb_peer = provider("b.it", vec![]);
    let pa_rp = provider("a.it", vec![authority_for("b.it", &pb_peer.certificate)]);

    // b.it delivers a message from alice and emits the delivery receipt.
    let transport = accepted_transport(&pa, &["bob@b.it"], SUBMISSION).await;
    let DpOutcome::Delivered(outcomes) = pb_peer
        .core
        .delivery_point()
        .handle(&envelope("posta-certificata@a.it", &["bob@b.it"]), &transport)
        .await
        .unwrap()
    else {
        panic!("envelope should have been delivered");
    };

    let outcome = pa_rp
        .core
        .reception_point()
        .handle(
            &envelope("posta-certificata@b.it", &["alice@a.it"]),
            &outcomes[0].receipt.bytes,
        )
        .await
        .unwrap();

    assert!(matches!(outcome, RpOutcome::Forwarded));
    let received = pa_rp.delivery_hop.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], outcomes[0].receipt.bytes);
}

/// Delivery of a transport envelope to a primary recipient: full receipt
/// with the original message attached.
#[tokio::test]
async fn delivery_to_primary_recipient() {
    let pa = provider("a.it", vec![]);
    let pb = provider("b.it", vec![authority_for("a.it", &pa.certificate)]);

    let transport = accepted_transport(&pa, &["bob@b.it"], SUBMISSION).await;

    let DpOutcome::Delivered(outcomes) = pb
        .core
        .delivery_point()
        .handle(&envelope("posta-certificata@a.it", &["bob@b.it"]), &transport)
        .await
        .unwrap()
    else {
        panic!("envelope should have been delivered");
    };

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].delivered);
    assert!(outcomes[0].dispatch.is_ok());

    // bob got the envelope.
    assert_eq!(
        pb.store
            .get_messages(&mailbox("bob@b.it"))
            .await
            .unwrap()
            .len(),
        1
    );

    // the receipt certifies the delivery and embeds the original message.
    let receipt_mail = parse(&outcomes[0].receipt.bytes);
    assert_eq!(classify(&receipt_mail).pec_type, PecType::DeliveryReceipt);
    assert_eq!(
        receipt_mail.get_header_value("Subject"),
        Some("CONSEGNA: Test")
    );
    assert_eq!(
        receipt_mail.get_header_value("X-Riferimento-Message-ID"),
        Some("<m1@a.it>")
    );
    assert_eq!(
        receipt_mail.get_header_value("X-Tipo-Ricevuta"),
        Some("normale")
    );
    assert!(has_embedded_message(&outcomes[0].receipt.bytes));

    // the receipt went back to a.it's provider.
    let sent = pb.provider_hop.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, vec![mailbox("alice@a.it")]);
}

/// S4: delivery to a Cc-only recipient omits the original message.
#[tokio::test]
async fn delivery_to_cc_recipient_omits_original() {
    let pa = provider("a.it", vec![]);
    let pd = provider("d.it", vec![authority_for("a.it", &pa.certificate)]);

    let submission = SUBMISSION.replace("To: bob@b.it\r\n", "To: bob@b.it\r\nCc: dan@d.it\r\n");
    let transport = accepted_transport(&pa, &["bob@b.it", "dan@d.it"], &submission).await;

    let DpOutcome::Delivered(outcomes) = pd
        .core
        .delivery_point()
        .handle(&envelope("posta-certificata@a.it", &["dan@d.it"]), &transport)
        .await
        .unwrap()
    else {
        panic!("envelope should have been delivered");
    };

    assert!(outcomes[0].delivered);
    let receipt_mail = parse(&outcomes[0].receipt.bytes);
    assert_eq!(classify(&receipt_mail).pec_type, PecType::DeliveryReceipt);
    assert!(!has_embedded_message(&outcomes[0].receipt.bytes));
}

/// S5: `X-TipoRicevuta: breve` yields a short receipt with the XML but no
/// original message.
#[tokio::test]
async fn short_receipt_on_request() {
    let pa = provider("a.it", vec![]);
    let pb = provider("b.it", vec![authority_for("a.it", &pa.certificate)]);

    let submission = SUBMISSION.replace(
        "Subject: Test\r\n",
        "Subject: Test\r\nX-TipoRicevuta: breve\r\n",
    );
    let transport = accepted_transport(&pa, &["bob@b.it"], &submission).await;

    let DpOutcome::Delivered(outcomes) = pb
        .core
        .delivery_point()
        .handle(&envelope("posta-certificata@a.it", &["bob@b.it"]), &transport)
        .await
        .unwrap()
    else {
        panic!("envelope should have been delivered");
    };

    let receipt_mail = parse(&outcomes[0].receipt.bytes);
    assert_eq!(
        receipt_mail.get_header_value("X-Tipo-Ricevuta"),
        Some("breve")
    );
    assert!(!has_embedded_message(&outcomes[0].receipt.bytes));
    assert!(String::from_utf8_lossy(&outcomes[0].receipt.bytes).contains("daticert.xml"));
}

/// A failing mailbox produces a non-delivery notice instead of a receipt.
#[tokio::test]
async fn mailbox_failure_produces_error_notice() {
    let pa = provider("a.it", vec![]);
    let pb = provider_with_store(
        "b.it",
        vec![authority_for("a.it", &pa.certificate)],
        Arc::new(MemoryStore::new()),
        Some("bob@b.it"),
    );

    let transport = accepted_transport(&pa, &["bob@b.it"], SUBMISSION).await;

    let DpOutcome::Delivered(outcomes) = pb
        .core
        .delivery_point()
        .handle(&envelope("posta-certificata@a.it", &["bob@b.it"]), &transport)
        .await
        .unwrap()
    else {
        panic!("the handler should have processed the envelope");
    };

    assert!(!outcomes[0].delivered);
    let notice_mail = parse(&outcomes[0].receipt.bytes);
    assert_eq!(
        classify(&notice_mail).pec_type,
        PecType::DeliveryErrorReceipt
    );
    assert_eq!(
        notice_mail.get_header_value("Subject"),
        Some("ERRORE CONSEGNA: Test")
    );
    assert!(
        String::from_utf8_lossy(&outcomes[0].receipt.bytes).contains("Avviso di mancata consegna")
    );
}

/// Receipts reaching the delivery point are appended unchanged.
#[tokio::test]
async fn receipts_at_delivery_point_are_stored() {
    let pa = provider("a.it", vec![]);
    let pb = provider("b.it", vec![authority_for("a.it", &pa.certificate)]);

    let transport = accepted_transport(&pa, &["bob@b.it"], SUBMISSION).await;
    let DpOutcome::Delivered(outcomes) = pb
        .core
        .delivery_point()
        .handle(&envelope("posta-certificata@a.it", &["bob@b.it"]), &transport)
        .await
        .unwrap()
    else {
        panic!("envelope should have been delivered");
    };

    // the delivery receipt arrives at a.it's delivery point.
    let pa_dp = provider("a.it", vec![]);
    let outcome = pa_dp
        .core
        .delivery_point()
        .handle(
            &envelope("posta-certificata@b.it", &["alice@a.it"]),
            &outcomes[0].receipt.bytes,
        )
        .await
        .unwrap();

    assert!(matches!(outcome, DpOutcome::Stored));
    let stored = pa_dp
        .store
        .get_messages(&mailbox("alice@a.it"))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].message, outcomes[0].receipt.bytes);
}

/// A plain message reaching the delivery point is not PEC.
#[tokio::test]
async fn plain_message_at_delivery_point_is_rejected() {
    let pb = provider("b.it", vec![]);

    let result = pb
        .core
        .delivery_point()
        .handle(&envelope("alice@a.it", &["bob@b.it"]), SUBMISSION.as_bytes())
        .await;

    assert!(matches!(result, Err(ProcessError::NotPec)));
}
