pub mod chaves_na_mao;
pub mod helpers;
pub mod leilao_imovel;
pub mod traits;
pub mod viva_real;
pub mod zap_imoveis;

pub use chaves_na_mao::ChavesNaMaoScraper;
pub use leilao_imovel::LeilaoImovelScraper;
pub use traits::CardExtractor;
pub use viva_real::VivaRealScraper;
pub use zap_imoveis::ZapImoveisScraper;
