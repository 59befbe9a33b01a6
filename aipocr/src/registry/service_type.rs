use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// One AIP OCR capability endpoint.
///
/// The identifier carries no behavior: endpoint URLs and default payloads
/// live in the [`ServiceRegistry`](super::ServiceRegistry) side-table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ServiceType {
    GeneralBasic,
    AccurateBasic,
    General,
    Accurate,
    GeneralEnhanced,
    WebImage,
    IdCard,
    BankCard,
    DrivingLicense,
    VehicleLicense,
    LicensePlate,
    BusinessLicense,
    Receipt,
    TrainTicket,
    TaxiReceipt,
    Form,
    TableRecognize,
    TableResultGet,
    VinCode,
    QuotaInvoice,
    HouseholdRegister,
    HkMacauExitEntryPermit,
    TaiwanExitEntryPermit,
    BirthCertificate,
    VehicleInvoice,
    VehicleCertificate,
    Invoice,
    AirTicket,
    InsuranceDocuments,
    VatInvoice,
    QrCode,
    Numbers,
    Lottery,
    Passport,
    BusinessCard,
    Handwriting,
    Custom,
}

struct Descriptor {
    id: &'static str,
    sdk_constant: &'static str,
    path: &'static str,
}

const fn d(id: &'static str, sdk_constant: &'static str, path: &'static str) -> Descriptor {
    Descriptor {
        id,
        sdk_constant,
        path,
    }
}

impl ServiceType {
    pub const ALL: [ServiceType; 37] = [
        ServiceType::GeneralBasic,
        ServiceType::AccurateBasic,
        ServiceType::General,
        ServiceType::Accurate,
        ServiceType::GeneralEnhanced,
        ServiceType::WebImage,
        ServiceType::IdCard,
        ServiceType::BankCard,
        ServiceType::DrivingLicense,
        ServiceType::VehicleLicense,
        ServiceType::LicensePlate,
        ServiceType::BusinessLicense,
        ServiceType::Receipt,
        ServiceType::TrainTicket,
        ServiceType::TaxiReceipt,
        ServiceType::Form,
        ServiceType::TableRecognize,
        ServiceType::TableResultGet,
        ServiceType::VinCode,
        ServiceType::QuotaInvoice,
        ServiceType::HouseholdRegister,
        ServiceType::HkMacauExitEntryPermit,
        ServiceType::TaiwanExitEntryPermit,
        ServiceType::BirthCertificate,
        ServiceType::VehicleInvoice,
        ServiceType::VehicleCertificate,
        ServiceType::Invoice,
        ServiceType::AirTicket,
        ServiceType::InsuranceDocuments,
        ServiceType::VatInvoice,
        ServiceType::QrCode,
        ServiceType::Numbers,
        ServiceType::Lottery,
        ServiceType::Passport,
        ServiceType::BusinessCard,
        ServiceType::Handwriting,
        ServiceType::Custom,
    ];

    fn descriptor(&self) -> Descriptor {
        match self {
            ServiceType::GeneralBasic => d("GENERAL_BASIC", "generalBasicUrl", "/rest/2.0/ocr/v1/general_basic"),
            ServiceType::AccurateBasic => d("ACCURATE_BASIC", "accurateBasicUrl", "/rest/2.0/ocr/v1/accurate_basic"),
            ServiceType::General => d("GENERAL", "generalUrl", "/rest/2.0/ocr/v1/general"),
            ServiceType::Accurate => d("ACCURATE", "accurateUrl", "/rest/2.0/ocr/v1/accurate"),
            ServiceType::GeneralEnhanced => d("GENERAL_ENHANCED", "generalEnhancedUrl", "/rest/2.0/ocr/v1/general_enhanced"),
            ServiceType::WebImage => d("WEB_IMAGE", "webImageUrl", "/rest/2.0/ocr/v1/webimage"),
            ServiceType::IdCard => d("IDCARD", "idcardUrl", "/rest/2.0/ocr/v1/idcard"),
            ServiceType::BankCard => d("BANKCARD", "bankcardUrl", "/rest/2.0/ocr/v1/bankcard"),
            ServiceType::DrivingLicense => d("DRIVING_LICENSE", "drivingLicenseUrl", "/rest/2.0/ocr/v1/driving_license"),
            ServiceType::VehicleLicense => d("VEHICLE_LICENSE", "vehicleLicenseUrl", "/rest/2.0/ocr/v1/vehicle_license"),
            ServiceType::LicensePlate => d("LICENSE_PLATE", "licensePlateUrl", "/rest/2.0/ocr/v1/license_plate"),
            ServiceType::BusinessLicense => d("BUSINESS_LICENSE", "businessLicenseUrl", "/rest/2.0/ocr/v1/business_license"),
            ServiceType::Receipt => d("RECEIPT", "receiptUrl", "/rest/2.0/ocr/v1/receipt"),
            ServiceType::TrainTicket => d("TRAIN_TICKET", "trainTicketUrl", "/rest/2.0/ocr/v1/train_ticket"),
            ServiceType::TaxiReceipt => d("TAXI_RECEIPT", "taxiReceiptUrl", "/rest/2.0/ocr/v1/taxi_receipt"),
            ServiceType::Form => d("FORM", "formUrl", "/rest/2.0/ocr/v1/form"),
            ServiceType::TableRecognize => d("TABLE_RECOGNIZE", "tableRecognizeUrl", "/rest/2.0/solution/v1/form_ocr/request"),
            ServiceType::TableResultGet => d("TABLE_RESULT_GET", "tableResultGetUrl", "/rest/2.0/solution/v1/form_ocr/get_request_result"),
            ServiceType::VinCode => d("VIN_CODE", "vinCodeUrl", "/rest/2.0/ocr/v1/vin_code"),
            ServiceType::QuotaInvoice => d("QUOTA_INVOICE", "quotaInvoiceUrl", "/rest/2.0/ocr/v1/quota_invoice"),
            ServiceType::HouseholdRegister => d("HOUSEHOLD_REGISTER", "householdRegisterUrl", "/rest/2.0/ocr/v1/household_register"),
            ServiceType::HkMacauExitEntryPermit => d("HK_MACAU_EXIT_ENTRY_PERMIT", "HKMacauExitentrypermitUrl", "/rest/2.0/ocr/v1/HK_Macau_exitentrypermit"),
            ServiceType::TaiwanExitEntryPermit => d("TAIWAN_EXIT_ENTRY_PERMIT", "taiwanExitentrypermitUrl", "/rest/2.0/ocr/v1/taiwan_exitentrypermit"),
            ServiceType::BirthCertificate => d("BIRTH_CERTIFICATE", "birthCertificateUrl", "/rest/2.0/ocr/v1/birth_certificate"),
            ServiceType::VehicleInvoice => d("VEHICLE_INVOICE", "vehicleInvoiceUrl", "/rest/2.0/ocr/v1/vehicle_invoice"),
            ServiceType::VehicleCertificate => d("VEHICLE_CERTIFICATE", "vehicleCertificateUrl", "/rest/2.0/ocr/v1/vehicle_certificate"),
            ServiceType::Invoice => d("INVOICE", "invoiceUrl", "/rest/2.0/ocr/v1/invoice"),
            ServiceType::AirTicket => d("AIR_TICKET", "airTicketUrl", "/rest/2.0/ocr/v1/air_ticket"),
            ServiceType::InsuranceDocuments => d("INSURANCE_DOCUMENTS", "insuranceDocumentsUrl", "/rest/2.0/ocr/v1/insurance_documents"),
            ServiceType::VatInvoice => d("VAT_INVOICE", "vatInvoiceUrl", "/rest/2.0/ocr/v1/vat_invoice"),
            ServiceType::QrCode => d("QRCODE", "qrcodeUrl", "/rest/2.0/ocr/v1/qrcode"),
            ServiceType::Numbers => d("NUMBERS", "numbersUrl", "/rest/2.0/ocr/v1/numbers"),
            ServiceType::Lottery => d("LOTTERY", "lotteryUrl", "/rest/2.0/ocr/v1/lottery"),
            ServiceType::Passport => d("PASSPORT", "passportUrl", "/rest/2.0/ocr/v1/passport"),
            ServiceType::BusinessCard => d("BUSINESS_CARD", "businessCardUrl", "/rest/2.0/ocr/v1/business_card"),
            ServiceType::Handwriting => d("HANDWRITING", "handwritingUrl", "/rest/2.0/ocr/v1/handwriting"),
            ServiceType::Custom => d("CUSTOM", "customUrl", "/rest/2.0/solution/v1/iocr/recognise"),
        }
    }

    /// Stable string identifier, e.g. `GENERAL_BASIC`.
    pub fn as_str(&self) -> &'static str {
        self.descriptor().id
    }

    /// Name of the endpoint constant in the provider SDK, used by
    /// endpoint manifests.
    pub fn sdk_constant(&self) -> &'static str {
        self.descriptor().sdk_constant
    }

    /// Endpoint path relative to the API host.
    pub fn path(&self) -> &'static str {
        self.descriptor().path
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ServiceType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OcrError::UnknownServiceType(s.to_string()))
    }
}

impl TryFrom<String> for ServiceType {
    type Error = OcrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServiceType> for String {
    fn from(value: ServiceType) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identifiers_are_unique() {
        let ids: HashSet<_> = ServiceType::ALL.iter().map(|t| t.as_str()).collect();
        let constants: HashSet<_> = ServiceType::ALL.iter().map(|t| t.sdk_constant()).collect();
        let paths: HashSet<_> = ServiceType::ALL.iter().map(|t| t.path()).collect();
        assert_eq!(ids.len(), ServiceType::ALL.len());
        assert_eq!(constants.len(), ServiceType::ALL.len());
        assert_eq!(paths.len(), ServiceType::ALL.len());
    }

    #[test]
    fn test_parse_round_trips_every_variant() {
        for t in ServiceType::ALL {
            assert_eq!(t.as_str().parse::<ServiceType>().unwrap(), t);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            "general_basic".parse::<ServiceType>().unwrap(),
            ServiceType::GeneralBasic
        );
        assert_eq!(" Idcard ".parse::<ServiceType>().unwrap(), ServiceType::IdCard);
    }

    #[test]
    fn test_parse_unknown_type() {
        let err = "BAIDU_TELEPATHY".parse::<ServiceType>().unwrap_err();
        assert!(matches!(err, OcrError::UnknownServiceType(ref s) if s == "BAIDU_TELEPATHY"));
    }

    #[test]
    fn test_serde_uses_identifier() {
        let json = serde_json::to_string(&ServiceType::VatInvoice).unwrap();
        assert_eq!(json, "\"VAT_INVOICE\"");
        let back: ServiceType = serde_json::from_str("\"vat_invoice\"").unwrap();
        assert_eq!(back, ServiceType::VatInvoice);
        assert!(serde_json::from_str::<ServiceType>("\"NOPE\"").is_err());
    }
}
