//! # InterventionRepository
//!
//! 割り当て付きインターベンション（受信者解決の入力）を取得する。

use std::str::FromStr;

use async_trait::async_trait;
use seido_domain::{
    intervention::{InterventionId, InterventionWithAssignments, TeamId},
    user::{UserId, UserRole},
};
use serde::Deserialize;

use crate::{
    error::InfraError,
    supabase::{REST_SERVICE, SupabaseClient, handle_response},
};

/// インターベンションリポジトリトレイト
#[async_trait]
pub trait InterventionRepository: Send + Sync {
    /// 割り当てとチームメンバーを含めてインターベンションを取得
    ///
    /// # 戻り値
    ///
    /// - `Ok(Some(intervention))`: 見つかった場合
    /// - `Ok(None)`: 見つからない場合
    /// - `Err(_)`: 通信エラー
    async fn find_with_assignments(
        &self,
        id: &InterventionId,
    ) -> Result<Option<InterventionWithAssignments>, InfraError>;
}

#[derive(Debug, Deserialize)]
struct InterventionRow {
    id:                       InterventionId,
    team_id:                  TeamId,
    reference:                String,
    title:                    String,
    description:              Option<String>,
    location:                 Option<String>,
    #[serde(default)]
    intervention_assignments: Vec<MemberRow>,
}

/// ロールは文字列のまま受け取り、組み立て時に解釈する
///
/// 通知の対象外のロール（`admin` など）を持つ行が 1 件あっても、
/// インターベンション全体の取得は失敗させない。
#[derive(Debug, Deserialize)]
struct MemberRow {
    user_id: UserId,
    role:    String,
}

impl MemberRow {
    fn known_role(&self, source: &'static str) -> Option<UserRole> {
        match UserRole::from_str(&self.role) {
            Ok(role) => Some(role),
            Err(_) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    role = %self.role,
                    source,
                    "未知のロールの行を読み飛ばす"
                );
                None
            }
        }
    }
}

impl InterventionRow {
    fn into_domain(self, team_members: Vec<MemberRow>) -> InterventionWithAssignments {
        let mut intervention =
            InterventionWithAssignments::new(self.id, self.team_id, self.reference, self.title);
        if let Some(description) = self.description {
            intervention = intervention.with_description(description);
        }
        if let Some(location) = self.location {
            intervention = intervention.with_location(location);
        }
        for row in self.intervention_assignments {
            if let Some(role) = row.known_role("intervention_assignments") {
                intervention = intervention.with_assignment(row.user_id, role);
            }
        }
        for row in team_members {
            if let Some(role) = row.known_role("team_members") {
                intervention = intervention.with_team_member(row.user_id, role);
            }
        }
        intervention
    }
}

/// PostgREST 実装の InterventionRepository
///
/// `interventions`（`intervention_assignments` を埋め込み）と
/// `team_members` の 2 回のクエリで割り当てグラフを組み立てる。
#[derive(Clone)]
pub struct SupabaseInterventionRepository {
    client: SupabaseClient,
}

impl SupabaseInterventionRepository {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InterventionRepository for SupabaseInterventionRepository {
    async fn find_with_assignments(
        &self,
        id: &InterventionId,
    ) -> Result<Option<InterventionWithAssignments>, InfraError> {
        let response = self
            .client
            .request(reqwest::Method::GET, "/rest/v1/interventions")
            .query(&[
                ("id", format!("eq.{id}")),
                (
                    "select",
                    "id,team_id,reference,title,description,location,\
                     intervention_assignments(user_id,role)"
                        .to_string(),
                ),
            ])
            .send()
            .await?;

        let rows: Vec<InterventionRow> = handle_response(REST_SERVICE, response).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        let response = self
            .client
            .request(reqwest::Method::GET, "/rest/v1/team_members")
            .query(&[
                ("team_id", format!("eq.{}", row.team_id)),
                ("select", "user_id,role".to_string()),
            ])
            .send()
            .await?;

        let team_members: Vec<MemberRow> = handle_response(REST_SERVICE, response).await?;

        Ok(Some(row.into_domain(team_members)))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::{
        Mock,
        MockServer,
        ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;
    use crate::supabase::SupabaseConfig;

    fn make_repository(server: &MockServer) -> SupabaseInterventionRepository {
        SupabaseInterventionRepository::new(SupabaseClient::new(&SupabaseConfig {
            url:              server.uri(),
            service_role_key: "service-key".to_string(),
        }))
    }

    #[tokio::test]
    async fn test_割り当てとチームメンバーを組み立てる() {
        let server = MockServer::start().await;
        let intervention_id = InterventionId::new();
        let team_id = TeamId::new();
        let tenant = UserId::new();
        let team_manager = UserId::new();

        Mock::given(method("GET"))
            .and(path("/rest/v1/interventions"))
            .and(query_param("id", format!("eq.{intervention_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": intervention_id,
                "team_id": team_id,
                "reference": "INT-2024-001",
                "title": "水漏れ修理",
                "description": null,
                "location": "Lot 3",
                "intervention_assignments": [{"user_id": tenant, "role": "tenant"}]
            }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/team_members"))
            .and(query_param("team_id", format!("eq.{team_id}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"user_id": team_manager, "role": "manager"}])),
            )
            .mount(&server)
            .await;

        let intervention = make_repository(&server)
            .find_with_assignments(&intervention_id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(intervention.reference(), "INT-2024-001");
        assert_eq!(intervention.location(), Some("Lot 3"));
        assert_eq!(intervention.description(), None);
        assert_eq!(
            intervention
                .assigned_with_role(UserRole::Tenant)
                .collect::<Vec<_>>(),
            vec![&tenant]
        );
        assert_eq!(intervention.team_members()[0].user_id, team_manager);
    }

    #[tokio::test]
    async fn test_未知のロールの行は読み飛ばす() {
        let server = MockServer::start().await;
        let intervention_id = InterventionId::new();
        let team_id = TeamId::new();
        let tenant = UserId::new();
        let manager = UserId::new();

        Mock::given(method("GET"))
            .and(path("/rest/v1/interventions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": intervention_id,
                "team_id": team_id,
                "reference": "INT-2024-002",
                "title": "Chauffage",
                "description": null,
                "location": null,
                "intervention_assignments": [
                    {"user_id": tenant, "role": "tenant"},
                    {"user_id": UserId::new(), "role": "syndic"}
                ]
            }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/team_members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"user_id": manager, "role": "manager"},
                {"user_id": UserId::new(), "role": "admin"}
            ])))
            .mount(&server)
            .await;

        let intervention = make_repository(&server)
            .find_with_assignments(&intervention_id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(intervention.assignments().len(), 1);
        assert_eq!(intervention.assignments()[0].user_id, tenant);
        assert_eq!(intervention.team_members().len(), 1);
        assert_eq!(intervention.team_members()[0].user_id, manager);
    }

    #[tokio::test]
    async fn test_見つからなければnone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/interventions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let result = make_repository(&server)
            .find_with_assignments(&InterventionId::new())
            .await
            .unwrap();

        assert!(result.is_none());
    }
}
