use config_tree_core::{locate, record_at, Statement, TreePath};
use serde::Deserialize;

use crate::commit::{Change, LiveView};
use crate::error::ReconcileError;
use crate::php::Directive;
use crate::validate::{FieldClass, FieldValidator};

/// Password and SSH keys of an existing local user.
///
/// pfSense stores only the hash, so the plain `password` key is normally
/// missing and a password request always counts as a change.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordParams {
    pub username: String,
    pub password: String,
    /// Base64 `authorized_keys` content.
    pub authorizedkeys: Option<String>,
}

pub fn plan(mut view: LiveView<'_>, params: &PasswordParams) -> Result<Change, ReconcileError> {
    let list = TreePath::key("system").child("user");
    let validator = FieldValidator::new()
        .with("username", FieldClass::Name)
        .with("password", FieldClass::Secret)
        .with("authorizedkeys", FieldClass::Base64);
    validator.check("username", &params.username)?;
    validator.check("password", &params.password)?;
    if let Some(keys) = &params.authorizedkeys {
        validator.check("authorizedkeys", keys)?;
    }

    let system = view.fetch(&TreePath::key("system"))?;
    let users = system.get("user").cloned().unwrap_or_default();
    let Some(pos) = locate(&users, "name", &params.username).position() else {
        return Err(ReconcileError::NotFound(format!("user {}", params.username)));
    };
    let user = list.index(pos);
    let live = record_at(&users, pos).cloned().unwrap_or_default();

    let mut change = view.change();
    if let Some(keys) = &params.authorizedkeys {
        if live.get_str("authorizedkeys") != Some(keys.as_str()) {
            change.push(Statement::set(user.child("authorizedkeys"), keys.as_str()));
        }
    }
    let password_differs = live.get_str("password") != Some(params.password.as_str());
    if password_differs || !change.is_empty() {
        change.push(Directive::SetUserPassword {
            user: user.clone(),
            password: params.password.clone(),
        });
        change.post.push(Directive::SyncUser { user }.into());
    }
    change.report("user", list);
    Ok(change)
}

#[cfg(test)]
mod tests {
    use config_tree_core::{Statement, TreePath};
    use pretty_assertions::assert_eq;

    use super::{plan, PasswordParams};
    use crate::commit::{commit_change, LiveView, RunOptions};
    use crate::error::ReconcileError;
    use crate::php::{Directive, Step};
    use crate::remote::MemoryAccessor;

    fn firewall() -> MemoryAccessor {
        MemoryAccessor::writable(
            serde_json::from_str(
                r#"{"system":{"user":[
                    {"name":"admin","uid":"0","bcrypt-hash":"$2y$10$abc"},
                    {"name":"ops","uid":"2000","authorizedkeys":"c3NoLWVkMjU1MTk="}
                ]}}"#,
            )
            .expect("json"),
        )
    }

    fn request(username: &str, keys: Option<&str>) -> PasswordParams {
        PasswordParams {
            username: username.to_string(),
            password: "correct horse; battery 'staple'".to_string(),
            authorizedkeys: keys.map(str::to_string),
        }
    }

    #[test]
    fn password_hashes_in_place_then_syncs_user() {
        let access = firewall();
        let change = plan(LiveView::new(&access), &request("ops", Some("c3NoLWVkMjU1MTk=")))
            .expect("plan");
        let user: TreePath = "system.user[1]".parse().expect("path");
        assert_eq!(
            change.steps,
            vec![Step::Call(Directive::SetUserPassword {
                user: user.clone(),
                password: "correct horse; battery 'staple'".to_string(),
            })]
        );
        assert_eq!(change.post, vec![Step::Call(Directive::SyncUser { user })]);

        let outcome = commit_change(&access, change, RunOptions::default()).expect("commit");
        assert!(outcome.changed);
        let script = &access.commits()[0];
        assert!(script.contains(r"local_user_set_password($config['system']['user'][1], 'correct horse; battery \'staple\'');"));
    }

    #[test]
    fn new_keys_are_set_on_the_located_user() {
        let access = firewall();
        let change = plan(LiveView::new(&access), &request("admin", Some("c3NoLXJzYQ==")))
            .expect("plan");
        let statements: Vec<&Statement> = change.statements().collect();
        assert_eq!(
            statements,
            vec![&Statement::set(
                "system.user[0].authorizedkeys".parse().expect("path"),
                "c3NoLXJzYQ=="
            )]
        );
    }

    #[test]
    fn unknown_user_is_not_found() {
        let access = firewall();
        let err = plan(LiveView::new(&access), &request("nobody", None)).expect_err("missing");
        assert!(matches!(err, ReconcileError::NotFound(_)));
    }

    #[test]
    fn control_characters_in_password_are_rejected() {
        let access = firewall();
        let mut params = request("ops", None);
        params.password = "line\nbreak".to_string();
        let err = plan(LiveView::new(&access), &params).expect_err("rejected");
        assert!(matches!(err, ReconcileError::Validation { .. }));
    }
}
