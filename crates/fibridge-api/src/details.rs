// Detail fetch
//
// One fixed, non-parameterized GraphQL query posted as an opaque string.
// The response is validated against a strict top-level shape; everything
// below the household level is deliberately untyped (`serde_json::Value`)
// because the bridge republishes it without interpreting the contents.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::FiClient;
use crate::error::Error;

/// The full-detail query. Selects base stations and pets across every
/// household the account can see: base identity/connectivity/position,
/// device state, connection-state fragments, ongoing activity (walk/rest
/// fragments), and daily/weekly/monthly step summaries.
const CURRENT_USER_FULL_DETAIL: &str = r"
    query CurrentUserFullDetail {
      currentUser {
        userHouseholds {
          household {
            bases {
              baseType: __typename
              baseId
              infoLastUpdated
              online
              onlineQuality
              name
              networkName
              position {
                latitude
                longitude
              }
            }
            pets {
              device {
                availableLedColors {
                  hexCode
                  ledColorCode
                  name
                }
                hasActiveSubscription
                hasSubscriptionOverride
                id
                info
                lastConnectionState {
                  connectionStateType: __typename
                  date
                  ... on ConnectedToBase {
                    chargingBase {
                      baseType: __typename
                      id
                      name
                    }
                  }
                  ... on ConnectedToCellular {
                    signalStrengthPercent
                  }
                  ... on ConnectedToUser {
                    user {
                      email
                      id
                    }
                  }
                  ... on UnknownConnectivity {
                    unknownConnectivity
                  }
                }
                ledColor {
                  hexCode
                  ledColorCode
                  name
                }
                moduleId
                nextLocationUpdateExpectedBy
                operationParams {
                  ledEnabled
                  ledOffAt
                  mode
                }
                subscriptionId
              }
              id
              name
              ongoingActivity(walksVersion: 1) {
                activityType: __typename
                areaName
                lastReportTimestamp
                obfuscatedReason
                presentUser {
                  id
                  email
                }
                start
                totalSteps
                uncertaintyInfo {
                  areaName
                  circle {
                    latitude
                    longitude
                    radius
                  }
                  updatedAt
                }
                ... on OngoingWalk {
                  distance
                  path {
                    latitude
                    longitude
                  }
                  positions {
                    date
                    errorRadius
                    position {
                      latitude
                      longitude
                    }
                  }
                }
                ... on OngoingRest {
                  place {
                    address
                    id
                    name
                    position {
                      latitude
                      longitude
                    }
                    radius
                  }
                  position {
                    latitude
                    longitude
                  }
                }
              }
              statDaily: currentActivitySummary (period: DAILY) {
                end
                start
                stepGoal
                totalDistance
                totalSteps
              }
              statMonthly: currentActivitySummary (period: MONTHLY) {
                end
                start
                stepGoal
                totalDistance
                totalSteps
              }
              statWeekly: currentActivitySummary (period: WEEKLY) {
                end
                start
                stepGoal
                totalDistance
                totalSteps
              }
            }
          }
        }
      }
    }
";

// ── Response shape ──────────────────────────────────────────────────
//
// Only the spine is typed. `bases`/`pets` elements must be arrays of
// whatever the vendor sends; `Vec<Value>` enforces exactly that and
// nothing more.

#[derive(Debug, Deserialize)]
struct DetailResponse {
    data: DetailData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailData {
    current_user: CurrentUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentUser {
    user_households: Vec<UserHousehold>,
}

#[derive(Debug, Deserialize)]
struct UserHousehold {
    household: Household,
}

#[derive(Debug, Deserialize)]
struct Household {
    bases: Vec<Value>,
    pets: Vec<Value>,
}

/// Validated, reshaped result of one detail fetch.
///
/// `bases` and `pets` are the concatenation, in encounter order, of every
/// household's arrays. Built fresh per poll cycle and discarded after
/// publish.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DetailSnapshot {
    pub bases: Vec<Value>,
    pub pets: Vec<Value>,
}

impl From<DetailResponse> for DetailSnapshot {
    fn from(response: DetailResponse) -> Self {
        let households = response.data.current_user.user_households;
        let mut bases = Vec::new();
        let mut pets = Vec::new();
        for entry in households {
            bases.extend(entry.household.bases);
            pets.extend(entry.household.pets);
        }
        Self { bases, pets }
    }
}

impl FiClient {
    /// Fetch the current household/base/pet state.
    ///
    /// Posts the fixed query through the re-login wrapper, so an expired
    /// session triggers one re-auth and one retry. Status handling is
    /// manual (no `error_for_status`) because only 401 is special; any
    /// other status falls through to body validation and fails there if
    /// the body isn't the expected shape.
    pub async fn fetch_details(&self) -> Result<DetailSnapshot, Error> {
        let url = self.graphql_url()?;
        let body = json!({ "query": CURRENT_USER_FULL_DETAIL });

        let response = self
            .send_with_relogin(|| self.http().post(url.clone()).json(&body).send())
            .await?;

        debug!(status = %response.status(), "detail response");

        let text = response.text().await.map_err(Error::Transport)?;
        let typed: DetailResponse =
            serde_json::from_str(&text).map_err(|e| Error::Validation {
                message: e.to_string(),
                body: text.clone(),
            })?;

        Ok(typed.into())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::{DetailResponse, DetailSnapshot};

    #[test]
    fn flattens_households_in_encounter_order() {
        let body = json!({
            "data": { "currentUser": { "userHouseholds": [
                { "household": { "bases": [{"id": "b1"}], "pets": [{"id": "p1"}, {"id": "p2"}] } },
                { "household": { "bases": [{"id": "b2"}, {"id": "b3"}], "pets": [] } },
            ]}}
        });

        let typed: DetailResponse = serde_json::from_value(body).unwrap();
        let snapshot = DetailSnapshot::from(typed);

        assert_eq!(snapshot.bases, vec![json!({"id": "b1"}), json!({"id": "b2"}), json!({"id": "b3"})]);
        assert_eq!(snapshot.pets, vec![json!({"id": "p1"}), json!({"id": "p2"})]);
    }

    #[test]
    fn missing_households_is_a_shape_error() {
        let body = json!({ "data": { "currentUser": {} } });
        assert!(serde_json::from_value::<DetailResponse>(body).is_err());
    }

    #[test]
    fn non_array_bases_is_a_shape_error() {
        let body = json!({
            "data": { "currentUser": { "userHouseholds": [
                { "household": { "bases": "nope", "pets": [] } },
            ]}}
        });
        assert!(serde_json::from_value::<DetailResponse>(body).is_err());
    }

    #[test]
    fn snapshot_serializes_to_published_shape() {
        let snapshot = DetailSnapshot {
            bases: vec![json!({"id": "b1"})],
            pets: vec![json!({"id": "p1"})],
        };
        assert_eq!(
            serde_json::to_string(&snapshot).unwrap(),
            r#"{"bases":[{"id":"b1"}],"pets":[{"id":"p1"}]}"#
        );
    }
}
