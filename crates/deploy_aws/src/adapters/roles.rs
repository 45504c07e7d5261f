use super::wait_for;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    pub name: String,
    pub arn: String,
}

/// Identity management surface used by the role provisioner. Lookup
/// distinguishes "absent" from every other failure; only absence selects
/// the creation path. Policy removal calls tolerate an already-absent
/// policy so replace runs converge from partially-provisioned state.
pub trait RoleStore {
    fn lookup(&self, role_name: &str) -> Result<Option<RoleRecord>, String>;
    fn create(&self, role_name: &str, trust_policy: &str) -> Result<RoleRecord, String>;
    fn delete(&self, role_name: &str) -> Result<(), String>;
    fn attach_managed_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), String>;
    fn detach_managed_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), String>;
    fn put_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        document: &str,
    ) -> Result<(), String>;
    fn delete_inline_policy(&self, role_name: &str, policy_name: &str) -> Result<(), String>;
}

pub struct AwsRoleStore {
    client: aws_sdk_iam::Client,
}

impl AwsRoleStore {
    pub fn new(client: aws_sdk_iam::Client) -> Self {
        Self { client }
    }
}

impl RoleStore for AwsRoleStore {
    fn lookup(&self, role_name: &str) -> Result<Option<RoleRecord>, String> {
        match wait_for(self.client.get_role().role_name(role_name).send()) {
            Ok(output) => {
                let role = output
                    .role()
                    .ok_or_else(|| format!("get-role response for '{role_name}' carried no role"))?;
                Ok(Some(RoleRecord {
                    name: role.role_name().to_string(),
                    arn: role.arn().to_string(),
                }))
            }
            Err(error) => {
                let service_error = error.into_service_error();
                if service_error.is_no_such_entity_exception() {
                    Ok(None)
                } else {
                    Err(format!("failed to look up role '{role_name}': {service_error}"))
                }
            }
        }
    }

    fn create(&self, role_name: &str, trust_policy: &str) -> Result<RoleRecord, String> {
        let output = wait_for(
            self.client
                .create_role()
                .role_name(role_name)
                .assume_role_policy_document(trust_policy)
                .send(),
        )
        .map_err(|error| {
            format!(
                "failed to create role '{role_name}': {}",
                error.into_service_error()
            )
        })?;
        let role = output
            .role()
            .ok_or_else(|| format!("create-role response for '{role_name}' carried no role"))?;
        Ok(RoleRecord {
            name: role.role_name().to_string(),
            arn: role.arn().to_string(),
        })
    }

    fn delete(&self, role_name: &str) -> Result<(), String> {
        wait_for(self.client.delete_role().role_name(role_name).send())
            .map(|_| ())
            .map_err(|error| {
                format!(
                    "failed to delete role '{role_name}': {}",
                    error.into_service_error()
                )
            })
    }

    fn attach_managed_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), String> {
        wait_for(
            self.client
                .attach_role_policy()
                .role_name(role_name)
                .policy_arn(policy_arn)
                .send(),
        )
        .map(|_| ())
        .map_err(|error| {
            format!(
                "failed to attach policy '{policy_arn}' to role '{role_name}': {}",
                error.into_service_error()
            )
        })
    }

    fn detach_managed_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), String> {
        match wait_for(
            self.client
                .detach_role_policy()
                .role_name(role_name)
                .policy_arn(policy_arn)
                .send(),
        ) {
            Ok(_) => Ok(()),
            Err(error) => {
                let service_error = error.into_service_error();
                if service_error.is_no_such_entity_exception() {
                    Ok(())
                } else {
                    Err(format!(
                        "failed to detach policy '{policy_arn}' from role '{role_name}': {service_error}"
                    ))
                }
            }
        }
    }

    fn put_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        document: &str,
    ) -> Result<(), String> {
        wait_for(
            self.client
                .put_role_policy()
                .role_name(role_name)
                .policy_name(policy_name)
                .policy_document(document)
                .send(),
        )
        .map(|_| ())
        .map_err(|error| {
            format!(
                "failed to put inline policy '{policy_name}' on role '{role_name}': {}",
                error.into_service_error()
            )
        })
    }

    fn delete_inline_policy(&self, role_name: &str, policy_name: &str) -> Result<(), String> {
        match wait_for(
            self.client
                .delete_role_policy()
                .role_name(role_name)
                .policy_name(policy_name)
                .send(),
        ) {
            Ok(_) => Ok(()),
            Err(error) => {
                let service_error = error.into_service_error();
                if service_error.is_no_such_entity_exception() {
                    Ok(())
                } else {
                    Err(format!(
                        "failed to delete inline policy '{policy_name}' on role '{role_name}': {service_error}"
                    ))
                }
            }
        }
    }
}
