pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XFORMS_NS: &str = "http://www.w3.org/2002/xforms";
pub const XSLTFORMS_NS: &str = "http://www.agencexml.com/xsltforms";
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
