//! Employer settings store

use hirebase_core::{HirebaseError, HirebaseResult, PersistenceStatus, StorageBackend, Timestamp};
use hirebase_state::{Aggregate, PersistentStore, Subscription, SyncCoordinator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Employer dashboard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct EmployerSettings {
    pub company: CompanySettings,
    pub recruitment: RecruitmentSettings,
}

/// Public company profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompanySettings {
    pub company_name: String,
    pub industry: String,
    pub company_size: String,
    pub website: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub description: String,
}

impl Default for CompanySettings {
    fn default() -> Self {
        Self {
            company_name: "TechCorp Solutions".to_string(),
            industry: "Technology".to_string(),
            company_size: "50-200".to_string(),
            website: "https://techcorp.example.com".to_string(),
            email: "hr@techcorp.example.com".to_string(),
            phone: "+1 (555) 123-4567".to_string(),
            location: "San Francisco, CA".to_string(),
            description: "Leading technology solutions provider".to_string(),
        }
    }
}

/// Who can see newly posted jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobVisibility {
    #[default]
    Public,
    Private,
}

/// How applications are handled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecruitmentSettings {
    pub auto_reply_enabled: bool,
    pub auto_reply_message: String,
    pub application_deadline_days: u32,
    pub require_cover_letter: bool,
    pub notify_on_application: bool,
    pub default_job_visibility: JobVisibility,
    pub screening_questions: Vec<String>,
}

impl Default for RecruitmentSettings {
    fn default() -> Self {
        Self {
            auto_reply_enabled: true,
            auto_reply_message: "Thank you for your application. We will review it and get back to you soon."
                .to_string(),
            application_deadline_days: 30,
            require_cover_letter: false,
            notify_on_application: true,
            default_job_visibility: JobVisibility::Public,
            screening_questions: Vec::new(),
        }
    }
}

/// Sparse change to the company section; `None` keeps the current value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CompanyPatch {
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl CompanyPatch {
    fn apply_to(self, company: &mut CompanySettings) {
        if let Some(v) = self.company_name {
            company.company_name = v;
        }
        if let Some(v) = self.industry {
            company.industry = v;
        }
        if let Some(v) = self.company_size {
            company.company_size = v;
        }
        if let Some(v) = self.website {
            company.website = v;
        }
        if let Some(v) = self.email {
            company.email = v;
        }
        if let Some(v) = self.phone {
            company.phone = v;
        }
        if let Some(v) = self.location {
            company.location = v;
        }
        if let Some(v) = self.description {
            company.description = v;
        }
    }
}

impl From<CompanySettings> for CompanyPatch {
    fn from(c: CompanySettings) -> Self {
        Self {
            company_name: Some(c.company_name),
            industry: Some(c.industry),
            company_size: Some(c.company_size),
            website: Some(c.website),
            email: Some(c.email),
            phone: Some(c.phone),
            location: Some(c.location),
            description: Some(c.description),
        }
    }
}

/// Sparse change to the recruitment section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RecruitmentPatch {
    pub auto_reply_enabled: Option<bool>,
    pub auto_reply_message: Option<String>,
    pub application_deadline_days: Option<u32>,
    pub require_cover_letter: Option<bool>,
    pub notify_on_application: Option<bool>,
    pub default_job_visibility: Option<JobVisibility>,
    pub screening_questions: Option<Vec<String>>,
}

impl RecruitmentPatch {
    fn apply_to(self, recruitment: &mut RecruitmentSettings) {
        if let Some(v) = self.auto_reply_enabled {
            recruitment.auto_reply_enabled = v;
        }
        if let Some(v) = self.auto_reply_message {
            recruitment.auto_reply_message = v;
        }
        if let Some(v) = self.application_deadline_days {
            recruitment.application_deadline_days = v;
        }
        if let Some(v) = self.require_cover_letter {
            recruitment.require_cover_letter = v;
        }
        if let Some(v) = self.notify_on_application {
            recruitment.notify_on_application = v;
        }
        if let Some(v) = self.default_job_visibility {
            recruitment.default_job_visibility = v;
        }
        if let Some(v) = self.screening_questions {
            recruitment.screening_questions = v;
        }
    }
}

impl From<RecruitmentSettings> for RecruitmentPatch {
    fn from(r: RecruitmentSettings) -> Self {
        Self {
            auto_reply_enabled: Some(r.auto_reply_enabled),
            auto_reply_message: Some(r.auto_reply_message),
            application_deadline_days: Some(r.application_deadline_days),
            require_cover_letter: Some(r.require_cover_letter),
            notify_on_application: Some(r.notify_on_application),
            default_job_visibility: Some(r.default_job_visibility),
            screening_questions: Some(r.screening_questions),
        }
    }
}

/// Partial update of the settings, merged one level deep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    pub company: Option<CompanyPatch>,
    pub recruitment: Option<RecruitmentPatch>,
}

impl SettingsPatch {
    pub fn company(patch: CompanyPatch) -> Self {
        Self {
            company: Some(patch),
            recruitment: None,
        }
    }
    
    pub fn recruitment(patch: RecruitmentPatch) -> Self {
        Self {
            company: None,
            recruitment: Some(patch),
        }
    }
    
    /// Check the fields this patch sets
    pub fn validate(&self) -> HirebaseResult<()> {
        if let Some(company) = &self.company {
            if let Some(name) = &company.company_name {
                if name.trim().is_empty() {
                    return Err(HirebaseError::InvalidSettings(
                        "company name must not be blank".into(),
                    ));
                }
            }
            if let Some(email) = &company.email {
                if !email.is_empty() && !email.contains('@') {
                    return Err(HirebaseError::InvalidSettings(format!(
                        "'{}' is not an email address",
                        email
                    )));
                }
            }
        }
        
        if let Some(recruitment) = &self.recruitment {
            if let Some(days) = recruitment.application_deadline_days {
                if !(1..=365).contains(&days) {
                    return Err(HirebaseError::InvalidSettings(format!(
                        "application deadline must be 1-365 days, got {}",
                        days
                    )));
                }
            }
        }
        
        Ok(())
    }
}

impl From<EmployerSettings> for SettingsPatch {
    fn from(settings: EmployerSettings) -> Self {
        Self {
            company: Some(settings.company.into()),
            recruitment: Some(settings.recruitment.into()),
        }
    }
}

impl Aggregate for EmployerSettings {
    type Update = SettingsPatch;
    const NAME: &'static str = "settings";
    
    fn apply(&mut self, update: SettingsPatch) {
        if let Some(company) = update.company {
            company.apply_to(&mut self.company);
        }
        if let Some(recruitment) = update.recruitment {
            recruitment.apply_to(&mut self.recruitment);
        }
    }
}

impl EmployerSettings {
    /// Closing time for applications to a job posted at `posted_at`
    pub fn application_deadline(&self, posted_at: Timestamp) -> Timestamp {
        let days = self.recruitment.application_deadline_days as u64;
        Timestamp::from_millis(posted_at.as_millis().saturating_add(days * MS_PER_DAY))
    }
}

/// Settings store shared by every employer dashboard view
#[derive(Clone)]
pub struct SettingsStore {
    coordinator: SyncCoordinator<EmployerSettings>,
}

impl SettingsStore {
    pub async fn open(backend: Arc<dyn StorageBackend>, key: &str) -> Self {
        Self::from_coordinator(SyncCoordinator::open(PersistentStore::new(backend, key)).await)
    }
    
    pub fn from_coordinator(coordinator: SyncCoordinator<EmployerSettings>) -> Self {
        Self { coordinator }
    }
    
    pub fn read(&self) -> Arc<EmployerSettings> {
        self.coordinator.read()
    }
    
    /// Validate and apply a patch. Rejected patches leave the store untouched.
    pub async fn update(&self, patch: SettingsPatch) -> HirebaseResult<Arc<EmployerSettings>> {
        patch.validate()?;
        self.coordinator.update(patch).await
    }
    
    pub async fn update_company(&self, patch: CompanyPatch) -> HirebaseResult<Arc<EmployerSettings>> {
        self.update(SettingsPatch::company(patch)).await
    }
    
    pub async fn update_recruitment(
        &self,
        patch: RecruitmentPatch,
    ) -> HirebaseResult<Arc<EmployerSettings>> {
        self.update(SettingsPatch::recruitment(patch)).await
    }
    
    /// Restore the compiled-in defaults
    pub async fn reset(&self) -> HirebaseResult<Arc<EmployerSettings>> {
        self.coordinator
            .update(EmployerSettings::default().into())
            .await
    }
    
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.coordinator.subscribe(listener)
    }
    
    pub fn persistence_status(&self) -> PersistenceStatus {
        self.coordinator.persistence_status()
    }
    
    pub fn coordinator(&self) -> &SyncCoordinator<EmployerSettings> {
        &self.coordinator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hirebase_state::MemoryBackend;
    
    async fn open_store() -> (Arc<MemoryBackend>, SettingsStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = SettingsStore::open(backend.clone(), "employerSettings").await;
        (backend, store)
    }
    
    #[test]
    fn test_patch_merges_one_level_deep() {
        let mut settings = EmployerSettings::default();
        settings.apply(SettingsPatch::company(CompanyPatch {
            location: Some("Austin, TX".into()),
            ..Default::default()
        }));
        
        assert_eq!(settings.company.location, "Austin, TX");
        assert_eq!(settings.company.company_name, "TechCorp Solutions");
        assert_eq!(settings.recruitment, RecruitmentSettings::default());
    }
    
    #[test]
    fn test_snapshot_uses_camel_case_and_fills_missing_fields() {
        let json = serde_json::to_value(EmployerSettings::default()).unwrap();
        assert_eq!(json["company"]["companyName"], "TechCorp Solutions");
        assert_eq!(json["recruitment"]["applicationDeadlineDays"], 30);
        
        let loaded: EmployerSettings = serde_json::from_str(
            r#"{"company": {"companyName": "Acme", "logoUrl": "x.png"}, "theme": "dark"}"#,
        )
        .unwrap();
        assert_eq!(loaded.company.company_name, "Acme");
        assert_eq!(loaded.company.industry, "Technology");
        assert_eq!(loaded.recruitment, RecruitmentSettings::default());
    }
    
    #[test]
    fn test_validation() {
        let blank = SettingsPatch::company(CompanyPatch {
            company_name: Some("   ".into()),
            ..Default::default()
        });
        assert!(matches!(blank.validate(), Err(HirebaseError::InvalidSettings(_))));
        
        let email = SettingsPatch::company(CompanyPatch {
            email: Some("not-an-email".into()),
            ..Default::default()
        });
        assert!(email.validate().is_err());
        
        let deadline = SettingsPatch::recruitment(RecruitmentPatch {
            application_deadline_days: Some(0),
            ..Default::default()
        });
        assert!(deadline.validate().is_err());
        
        assert!(SettingsPatch::from(EmployerSettings::default()).validate().is_ok());
    }
    
    #[test]
    fn test_application_deadline() {
        let settings = EmployerSettings::default();
        let posted = Timestamp::from_millis(1_000);
        assert_eq!(
            settings.application_deadline(posted).as_millis(),
            1_000 + 30 * MS_PER_DAY
        );
    }
    
    #[tokio::test]
    async fn test_update_company_name() {
        let (_backend, store) = open_store().await;
        let before = store.read();
        
        let after = store
            .update_company(CompanyPatch {
                company_name: Some("Acme".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        
        assert_eq!(after.company.company_name, "Acme");
        assert_eq!(
            CompanySettings {
                company_name: before.company.company_name.clone(),
                ..after.company.clone()
            },
            before.company
        );
        assert_eq!(after.recruitment, before.recruitment);
    }
    
    #[tokio::test]
    async fn test_rejected_patch_leaves_store_untouched() {
        let (backend, store) = open_store().await;
        
        let result = store
            .update_recruitment(RecruitmentPatch {
                application_deadline_days: Some(400),
                ..Default::default()
            })
            .await;
        
        assert!(result.is_err());
        assert_eq!(*store.read(), EmployerSettings::default());
        assert_eq!(backend.write_count(), 0);
    }
    
    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let (_backend, store) = open_store().await;
        store
            .update_recruitment(RecruitmentPatch {
                require_cover_letter: Some(true),
                screening_questions: Some(vec!["Years of Rust?".into()]),
                ..Default::default()
            })
            .await
            .unwrap();
        
        let reset = store.reset().await.unwrap();
        assert_eq!(*reset, EmployerSettings::default());
    }
}
