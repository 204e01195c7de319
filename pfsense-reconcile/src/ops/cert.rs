use config_tree_core::{plan_record, Presence, RecordSchema, TreePath};
use serde::Deserialize;

use crate::commit::{Change, LiveView};
use crate::error::ReconcileError;
use crate::ops::record_of;
use crate::validate::{FieldClass, FieldValidator};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertParams {
    #[serde(default)]
    pub state: Presence,
    pub refid: String,
    pub descr: String,
    /// Base64 PEM certificate.
    pub crt: String,
    /// Base64 PEM private key.
    pub prv: String,
}

pub fn plan(mut view: LiveView<'_>, params: &CertParams) -> Result<Change, ReconcileError> {
    let list = TreePath::key("cert");
    let schema = RecordSchema::new(list.clone(), "refid").with_init_container(list.clone());
    let validator = FieldValidator::new()
        .with("refid", FieldClass::Token)
        .with_all(&["crt", "prv"], FieldClass::Base64);

    let desired = record_of([
        ("refid", Some(params.refid.as_str())),
        ("descr", Some(params.descr.as_str())),
        ("crt", Some(params.crt.as_str())),
        ("prv", Some(params.prv.as_str())),
    ]);
    let records = view.fetch(&list)?;
    let planned = plan_record(&schema, &records, &desired, params.state, &validator)?;

    let mut change = view.change();
    change.extend(planned.statements);
    change.report("cert", list);
    Ok(change)
}

#[cfg(test)]
mod tests {
    use config_tree_core::Statement;
    use pretty_assertions::assert_eq;

    use super::{plan, CertParams};
    use crate::commit::LiveView;
    use crate::error::ReconcileError;
    use crate::remote::MemoryAccessor;

    fn firewall() -> MemoryAccessor {
        MemoryAccessor::writable(
            serde_json::from_str(
                r#"{"cert":[{"refid":"5c1a","descr":"gui","crt":"QUFB","prv":"QkJC"}]}"#,
            )
            .expect("json"),
        )
    }

    fn params(descr: &str, crt: &str) -> CertParams {
        CertParams {
            state: Default::default(),
            refid: "5c1a".to_string(),
            descr: descr.to_string(),
            crt: crt.to_string(),
            prv: "QkJC".to_string(),
        }
    }

    #[test]
    fn only_changed_fields_are_set() {
        let access = firewall();
        let change = plan(LiveView::new(&access), &params("gui", "Q0ND")).expect("plan");
        let statements: Vec<&Statement> = change.statements().collect();
        assert_eq!(
            statements,
            vec![&Statement::set("cert[0].crt".parse().expect("path"), "Q0ND")]
        );
    }

    #[test]
    fn non_base64_certificate_is_rejected() {
        let access = firewall();
        let err = plan(
            LiveView::new(&access),
            &params("gui", "-----BEGIN CERTIFICATE-----"),
        )
        .expect_err("rejected");
        assert!(matches!(err, ReconcileError::Validation { .. }));
    }
}
